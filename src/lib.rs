// Monka Battery - Shared Library
// Vendor config, calibration, polling, failover and battery alerts

pub mod battery;
pub mod config;
pub mod devices;
pub mod failover;
pub mod monitor;
pub mod notify;
pub mod poller;
pub mod settings;
pub mod status;

pub use battery::{CalibrationError, CalibrationTable, DEFAULT_THRESHOLDS};
pub use config::{ConfigError, ConfigSource, VendorConfig};
pub use devices::DeviceList;
pub use failover::{ActiveSet, Failover};
pub use monitor::Monitor;
pub use notify::{Alert, AlertKind, LogNotifier, NotificationPolicy, Notifier, NotifyError};
pub use poller::{BatteryPoller, DeviceRuntimeState};
pub use settings::{Settings, SettingsError};
pub use status::{PowerSupplyStatus, StatusError, StatusExport, TrayStatus};
