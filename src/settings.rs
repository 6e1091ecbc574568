//! Application settings (`settings.toml`)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CONFIG_FILE_NAME;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("settings I/O on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Runtime settings, every field optional in the file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Vendor `Config.ini` (default: next to this file)
    pub vendor_config: Option<PathBuf>,
    /// Explicit vendor library path, tried before the usual locations
    pub driver_library: Option<PathBuf>,
    pub notifications_enabled: bool,
    pub battery_interval_secs: u64,
    pub health_check_interval_secs: u64,
    pub discovery_interval_secs: u64,
    /// HID presence poll (only with the `hotplug` feature)
    pub presence_interval_secs: u64,
    /// A device is online while its last response is younger than this
    pub liveness_window_secs: u64,
    /// Failover triggers when no active path answered within this
    pub response_timeout_secs: u64,
    pub export_status: bool,
    /// Directory for the exported status files
    pub status_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vendor_config: None,
            driver_library: None,
            notifications_enabled: true,
            battery_interval_secs: 5,
            health_check_interval_secs: 2,
            discovery_interval_secs: 30,
            presence_interval_secs: 3,
            liveness_window_secs: 10,
            response_timeout_secs: 5,
            export_status: false,
            status_dir: None,
        }
    }
}

impl Settings {
    /// Default settings file path
    pub fn default_path() -> PathBuf {
        config_dir().join("settings.toml")
    }

    /// Load settings from a file, or defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(io_err)
    }

    /// Effective vendor config path
    pub fn vendor_config_path(&self) -> PathBuf {
        self.vendor_config
            .clone()
            .unwrap_or_else(|| config_dir().join(CONFIG_FILE_NAME))
    }

    /// Effective status export directory
    pub fn status_dir(&self) -> PathBuf {
        self.status_dir.clone().unwrap_or_else(|| {
            dirs::runtime_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("monka-battery")
        })
    }

    pub fn battery_interval(&self) -> Duration {
        secs(self.battery_interval_secs)
    }

    pub fn health_check_interval(&self) -> Duration {
        secs(self.health_check_interval_secs)
    }

    pub fn discovery_interval(&self) -> Duration {
        secs(self.discovery_interval_secs)
    }

    pub fn presence_interval(&self) -> Duration {
        secs(self.presence_interval_secs)
    }

    pub fn liveness_window(&self) -> Duration {
        Duration::from_secs(self.liveness_window_secs)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }
}

/// Interval of at least one second (tokio intervals reject zero)
fn secs(value: u64) -> Duration {
    Duration::from_secs(value.max(1))
}

/// Per-user configuration directory of this tool
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("monka-battery")
}
