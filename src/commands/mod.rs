//! Command handlers for the CLI application.
//!
//! - `monitor`: the long-running battery monitor
//! - `query`: read-only commands (list, battery)
//! - `utility`: configuration display

pub mod monitor;
pub mod query;
pub mod utility;

use std::path::PathBuf;

use monka_battery::{ConfigSource, Settings, VendorConfig};
use monka_transport::{load_driver, DriverOptions, SharedDriver};

/// Result type for command handlers
pub type CommandResult = anyhow::Result<()>;

/// Everything loaded before a command runs
pub struct Context {
    pub settings: Settings,
    pub settings_path: PathBuf,
    pub vendor: VendorConfig,
    pub vendor_source: ConfigSource,
    pub force_mock: bool,
}

impl Context {
    /// Select the vendor driver for this process
    pub fn driver(&self) -> SharedDriver {
        let options = DriverOptions {
            library_path: self.settings.driver_library.clone(),
            force_mock: self.force_mock,
        };
        load_driver(&options, &self.vendor.targets())
    }
}
