//! Status snapshot and sysfs-like export
//!
//! The monitor publishes one [`TrayStatus`] for the device it watches.
//! [`StatusExport`] mirrors it into plain files:
//!
//! - `capacity`: battery percentage
//! - `status`: `Charging`, `Discharging`, `Full` or `Unknown`
//! - `online`: `1` / `0`
//! - `updating`: `1` while failover is switching connections

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

const CAPACITY_FILE: &str = "capacity";
const STATUS_FILE: &str = "status";
const ONLINE_FILE: &str = "online";
const UPDATING_FILE: &str = "updating";

#[derive(Error, Debug)]
pub enum StatusError {
    #[error("failed to create status directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Power supply status values (as the kernel's power_supply class names them)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerSupplyStatus {
    Unknown,
    Charging,
    Discharging,
    Full,
}

impl PowerSupplyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Charging => "Charging",
            Self::Discharging => "Discharging",
            Self::Full => "Full",
        }
    }
}

/// Battery tuple shown for the watched device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrayStatus {
    pub device_name: String,
    pub battery_level: u8,
    pub charging: bool,
    pub online: bool,
    pub updating: bool,
}

impl TrayStatus {
    /// Placeholder before any device has been discovered
    pub fn no_device() -> Self {
        Self {
            device_name: monka_transport::FALLBACK_NAME.to_string(),
            battery_level: 0,
            charging: false,
            online: false,
            updating: false,
        }
    }

    pub fn tooltip(&self) -> String {
        if self.updating {
            format!("{} - Updating...", self.device_name)
        } else if !self.online {
            format!("{} - Offline", self.device_name)
        } else if self.charging {
            format!("{} - {}% (Charging)", self.device_name, self.battery_level)
        } else {
            format!("{} - {}%", self.device_name, self.battery_level)
        }
    }

    pub fn power_supply_status(&self) -> PowerSupplyStatus {
        if !self.online {
            PowerSupplyStatus::Unknown
        } else if self.charging {
            PowerSupplyStatus::Charging
        } else if self.battery_level >= 100 {
            PowerSupplyStatus::Full
        } else {
            PowerSupplyStatus::Discharging
        }
    }
}

/// Writes [`TrayStatus`] to files under a runtime directory
///
/// The directory is removed again when the export is dropped.
pub struct StatusExport {
    base_path: PathBuf,
}

impl StatusExport {
    pub fn new(dir: &Path) -> Result<Self, StatusError> {
        fs::create_dir_all(dir).map_err(|source| StatusError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let export = Self {
            base_path: dir.to_path_buf(),
        };
        export.update(&TrayStatus::no_device())?;
        debug!("Exporting battery status to {}", dir.display());
        Ok(export)
    }

    pub fn update(&self, status: &TrayStatus) -> Result<(), StatusError> {
        let capacity = if status.online {
            status.battery_level.to_string()
        } else {
            "0".to_string()
        };
        self.write_file(CAPACITY_FILE, &capacity)?;
        self.write_file(STATUS_FILE, status.power_supply_status().as_str())?;
        self.write_file(ONLINE_FILE, flag(status.online))?;
        self.write_file(UPDATING_FILE, flag(status.updating))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.base_path
    }

    fn write_file(&self, name: &str, value: &str) -> Result<(), StatusError> {
        let path = self.base_path.join(name);
        let result = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .and_then(|mut file| writeln!(file, "{value}"));
        result.map_err(|source| StatusError::Write { path, source })
    }
}

impl Drop for StatusExport {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.base_path);
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}
