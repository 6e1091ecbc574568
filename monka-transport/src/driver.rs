//! Vendor driver capability interface
//!
//! The vendor ships a native library with a small set of C exports. The rest
//! of the system only sees [`VendorDriver`]; which implementation backs it is
//! decided once by [`load_driver`] and never re-checked.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::TransportError;
use crate::mock::MockDriver;
use crate::types::{BatteryStatus, DiscoveryTargets, DriverEvent, DriverKind};

/// File name of the vendor library
pub const DRIVER_LIBRARY_NAME: &str = "hidusb.dll";

/// Capability set of the vendor driver
pub trait VendorDriver: Send + Sync {
    /// Which implementation this is
    fn kind(&self) -> DriverKind;

    /// Enumerate HID device paths for one vid/pid pair
    fn find_devices(
        &self,
        vid: &str,
        pid: &str,
        interface_id: i32,
        device_id: i32,
    ) -> Result<Vec<String>, TransportError>;

    /// Ask the driver whether a device path is reachable
    fn is_device_online(&self, device_path: &str) -> bool;

    /// Device address reported together with the online state, if supported
    fn device_address(&self, device_path: &str) -> Option<Vec<u8>>;

    /// Start the battery server on a device path.
    ///
    /// Battery packets are delivered asynchronously on `events`.
    fn start_server(
        &self,
        device_path: &str,
        events: mpsc::Sender<DriverEvent>,
    ) -> Result<(), TransportError>;

    /// Stop the battery server (no-op when not running)
    fn stop_server(&self);

    /// Fire an asynchronous battery read on the running server
    fn request_battery_level(&self) -> Result<(), TransportError>;

    /// Decode a raw battery packet
    fn decode_battery(&self, data: &[u8]) -> Option<BatteryStatus>;
}

/// Shared handle to the selected driver
pub type SharedDriver = Arc<dyn VendorDriver>;

/// How to obtain the driver
#[derive(Debug, Clone, Default)]
pub struct DriverOptions {
    /// Explicit library path (takes precedence over the search order)
    pub library_path: Option<PathBuf>,
    /// Skip the native library and use synthetic data
    pub force_mock: bool,
}

impl DriverOptions {
    /// Candidate library locations in search order.
    ///
    /// The last entry is the bare file name, resolved by the OS search path.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(path) = &self.library_path {
            candidates.push(path.clone());
        }
        if let Some(dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
        {
            candidates.push(dir.join(DRIVER_LIBRARY_NAME));
        }
        if let Ok(cwd) = std::env::current_dir() {
            candidates.push(cwd.join(DRIVER_LIBRARY_NAME));
        }
        candidates.push(PathBuf::from(DRIVER_LIBRARY_NAME));
        candidates
    }
}

/// Select the driver for the process lifetime.
///
/// Falls back to [`MockDriver`] when the native library cannot be loaded;
/// this is logged and never fatal.
pub fn load_driver(options: &DriverOptions, targets: &DiscoveryTargets) -> SharedDriver {
    if options.force_mock {
        info!("Mock driver requested");
        return Arc::new(MockDriver::synthetic(targets));
    }

    match load_native(options) {
        Ok(driver) => {
            info!("Vendor driver loaded");
            driver
        }
        Err(e) => {
            warn!("Failed to load vendor driver ({e}), using mock data");
            Arc::new(MockDriver::synthetic(targets))
        }
    }
}

#[cfg(windows)]
fn load_native(options: &DriverOptions) -> Result<SharedDriver, TransportError> {
    let mut last_err = TransportError::LibraryNotFound(DRIVER_LIBRARY_NAME.into());
    for candidate in options.candidates() {
        match crate::native::NativeDriver::load(&candidate) {
            Ok(driver) => {
                info!("Using vendor library {}", candidate.display());
                return Ok(Arc::new(driver));
            }
            Err(e) => {
                tracing::debug!("{}: {e}", candidate.display());
                last_err = e;
            }
        }
    }
    Err(last_err)
}

#[cfg(not(windows))]
fn load_native(_options: &DriverOptions) -> Result<SharedDriver, TransportError> {
    Err(TransportError::Unsupported("vendor driver requires Windows"))
}
