//! Vendor configuration (`Config.ini`)
//!
//! The vendor ships an INI-like file whose id fields are base64 encoded and
//! salted with the company name:
//!
//! ```text
//! [Option]
//! VID=TW9ua2EzNTU0          ; "Monka3554"
//! M_PID=TW9ua2FiMDBlLGIwMGY= ; "Monkab00e,b00f"
//! Interfaceid=0
//!
//! [Device1]
//! BatteryParam=3050,3420,...
//! ```
//!
//! Loading never fails: a missing or broken file falls back to the copy
//! compiled into the binary, and that to built-in ids.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use monka_transport::{DiscoveryTargets, COMPANY};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default configuration compiled into the binary
pub const DEFAULT_CONFIG_INI: &str = include_str!("../assets/Config.ini");

/// File name of the vendor configuration
pub const CONFIG_FILE_NAME: &str = "Config.ini";

/// Built-in ids used when no configuration parses
pub mod builtin {
    pub const VID: &str = "3554";
    pub const MOUSE_PIDS: &[&str] = &["b00e", "b00f"];
    pub const DONGLE_PIDS: &[&str] = &["b012", "b013"];
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("configuration has no vendor id")]
    MissingVid,
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigSource {
    File(PathBuf),
    Embedded,
    BuiltIn,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Embedded => f.write_str("embedded default"),
            Self::BuiltIn => f.write_str("built-in defaults"),
        }
    }
}

/// Vendor/product ids and calibration from `Config.ini`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VendorConfig {
    pub company: String,
    pub vid: String,
    pub mouse_pids: Vec<String>,
    pub dongle_pids: Vec<String>,
    pub interface_id: i32,
    pub device_id: i32,
    /// Raw `BatteryParam` thresholds in mV (validated by `CalibrationTable`)
    pub battery_param: Vec<u16>,
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self::builtin()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Option,
    Device1,
    Other,
}

impl VendorConfig {
    fn empty() -> Self {
        Self {
            company: COMPANY.to_string(),
            vid: String::new(),
            mouse_pids: Vec::new(),
            dongle_pids: Vec::new(),
            interface_id: 0,
            device_id: 0,
            battery_param: Vec::new(),
        }
    }

    /// Ids used when neither the file nor the embedded copy parse
    pub fn builtin() -> Self {
        Self {
            vid: builtin::VID.to_string(),
            mouse_pids: builtin::MOUSE_PIDS.iter().map(|s| s.to_string()).collect(),
            dongle_pids: builtin::DONGLE_PIDS.iter().map(|s| s.to_string()).collect(),
            ..Self::empty()
        }
    }

    /// Parse configuration text.
    ///
    /// Malformed values are logged and skipped. Succeeds iff a vendor id
    /// was obtained.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut config = Self::empty();
        let mut section = Section::Other;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if line.starts_with('[') {
                section = match line {
                    "[Option]" => Section::Option,
                    "[Device1]" => Section::Device1,
                    _ => Section::Other,
                };
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());

            match (section, key) {
                (Section::Option, "VID") => {
                    if let Some(vid) = config.decode_field(key, value) {
                        config.vid = vid;
                    }
                }
                (Section::Option, "M_PID") => {
                    if let Some(pids) = config.decode_field(key, value) {
                        config.mouse_pids.extend(split_list(&pids));
                    }
                }
                (Section::Option, "D_PID") => {
                    if let Some(pids) = config.decode_field(key, value) {
                        config.dongle_pids.extend(split_list(&pids));
                    }
                }
                (Section::Option, "Interfaceid") => match value.parse() {
                    Ok(id) => config.interface_id = id,
                    Err(e) => warn!("Ignoring config key {key}={value}: {e}"),
                },
                (Section::Option, "Deviceid") => match value.parse() {
                    Ok(id) => config.device_id = id,
                    Err(e) => warn!("Ignoring config key {key}={value}: {e}"),
                },
                (Section::Device1, "BatteryParam") => {
                    let parsed: Result<Vec<u16>, _> =
                        split_list(value).map(|v| v.parse::<u16>()).collect();
                    match parsed {
                        Ok(thresholds) => config.battery_param = thresholds,
                        Err(e) => warn!("Ignoring config key {key}: {e}"),
                    }
                }
                _ => debug!("Unknown config key {key}"),
            }
        }

        if config.vid.is_empty() {
            return Err(ConfigError::MissingVid);
        }
        Ok(config)
    }

    /// Decode a base64 field and strip the first company-name occurrence
    fn decode_field(&self, key: &str, value: &str) -> Option<String> {
        let Some(decoded) = decode_base64(value) else {
            warn!("Ignoring config key {key}: not base64");
            return None;
        };
        match String::from_utf8(decoded) {
            Ok(text) => Some(text.replacen(&self.company, "", 1).trim().to_string()),
            Err(_) => {
                warn!("Ignoring config key {key}: not valid text");
                None
            }
        }
    }

    /// Read and parse a configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Load from `path`, falling back to the embedded and built-in defaults.
    ///
    /// When `path` does not exist the embedded default is written there.
    pub fn load(path: &Path) -> (Self, ConfigSource) {
        let existed = path.exists();
        if existed {
            match Self::from_file(path) {
                Ok(config) => {
                    info!("Loaded vendor config from {}", path.display());
                    return (config, ConfigSource::File(path.to_path_buf()));
                }
                Err(e) => warn!("Vendor config {} unusable: {e}", path.display()),
            }
        }

        let embedded = Self::parse(DEFAULT_CONFIG_INI);
        if !existed {
            match write_default(path) {
                Ok(()) => info!("Created default vendor config: {}", path.display()),
                Err(e) => warn!("{e}"),
            }
        }

        match embedded {
            Ok(config) => (config, ConfigSource::Embedded),
            Err(e) => {
                warn!("Embedded vendor config unusable ({e}), using built-in ids");
                (Self::builtin(), ConfigSource::BuiltIn)
            }
        }
    }

    /// Ids handed to device discovery
    pub fn targets(&self) -> DiscoveryTargets {
        DiscoveryTargets {
            vid: self.vid.clone(),
            mouse_pids: self.mouse_pids.clone(),
            dongle_pids: self.dongle_pids.clone(),
            interface_id: self.interface_id,
            device_id: self.device_id,
        }
    }
}

/// Write the embedded default configuration to `path`
pub fn write_default(path: &Path) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, DEFAULT_CONFIG_INI).map_err(write_err)
}

fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
}

/// Lenient base64 decoding: stops at padding or the first foreign character.
///
/// Returns `None` when nothing decodes.
pub fn decode_base64(input: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len() * 3 / 4);
    let mut acc: u32 = 0;
    let mut bits = 0u32;

    for c in input.bytes() {
        let v = match c {
            b'A'..=b'Z' => c - b'A',
            b'a'..=b'z' => c - b'a' + 26,
            b'0'..=b'9' => c - b'0' + 52,
            b'+' => 62,
            b'/' => 63,
            _ => break,
        };
        acc = (acc << 6) | u32::from(v);
        bits += 6;
        if bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
            acc &= (1 << bits) - 1;
        }
    }

    (!out.is_empty()).then_some(out)
}
