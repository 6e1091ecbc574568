//! Synthetic driver used when the vendor library is unavailable
//!
//! Exposes a single wired mouse whose battery discharges along a fixed
//! script, so everything downstream (liveness, failover, notifications)
//! behaves the same as with real hardware. Tests build it with arbitrary
//! devices and drive online state and readings directly.

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use crate::driver::VendorDriver;
use crate::error::TransportError;
use crate::route::{RouteSlot, ServerRoute, BATTERY_COMMAND};
use crate::types::{BatteryStatus, DiscoveryTargets, DriverEvent, DriverKind};

/// Voltage the scripted discharge starts from (mV)
pub const SCRIPT_START_MV: u16 = 4110;
/// Voltage the scripted discharge wraps at (mV)
pub const SCRIPT_END_MV: u16 = 3420;
/// Voltage drop per battery read (mV)
pub const SCRIPT_STEP_MV: u16 = 2;

/// Fabricated battery reading for the n-th read request
pub fn fabricated_status(read_index: u32) -> BatteryStatus {
    let steps = u32::from((SCRIPT_START_MV - SCRIPT_END_MV) / SCRIPT_STEP_MV) + 1;
    let drop = (read_index % steps) * u32::from(SCRIPT_STEP_MV);
    BatteryStatus {
        level: 0,
        charging: false,
        voltage: SCRIPT_START_MV - drop as u16,
    }
}

/// A device the mock driver reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockDevice {
    pub vid: String,
    pub pid: String,
    pub device_path: String,
    /// Reported online and answers battery reads
    pub online: bool,
    pub address: Vec<u8>,
}

impl MockDevice {
    pub fn new(vid: &str, pid: &str, device_path: &str, online: bool) -> Self {
        Self {
            vid: vid.to_string(),
            pid: pid.to_string(),
            device_path: device_path.to_string(),
            online,
            address: Vec::new(),
        }
    }
}

/// Driver producing synthetic devices and battery data
pub struct MockDriver {
    devices: Mutex<Vec<MockDevice>>,
    route: RouteSlot,
    /// Fixed reading overriding the script
    reading: Mutex<Option<BatteryStatus>>,
    reads: AtomicU32,
    enumeration: bool,
}

impl MockDriver {
    /// Single synthetic wired mouse on the first configured mouse pid
    pub fn synthetic(targets: &DiscoveryTargets) -> Self {
        let pid = targets
            .mouse_pids
            .first()
            .map(String::as_str)
            .unwrap_or("b00e");
        let path = format!(r"\\?\hid#vid_{}&pid_{}#mock-usb#0", targets.vid, pid);
        Self::with_devices(vec![MockDevice::new(&targets.vid, pid, &path, true)])
    }

    pub fn with_devices(devices: Vec<MockDevice>) -> Self {
        Self {
            devices: Mutex::new(devices),
            route: RouteSlot::new(),
            reading: Mutex::new(None),
            reads: AtomicU32::new(0),
            enumeration: true,
        }
    }

    /// Driver whose enumeration export is missing
    pub fn without_enumeration() -> Self {
        Self {
            enumeration: false,
            ..Self::with_devices(Vec::new())
        }
    }

    pub fn set_devices(&self, devices: Vec<MockDevice>) {
        *self.devices.lock() = devices;
    }

    /// Change whether a device is online (and answers reads)
    pub fn set_online(&self, device_path: &str, online: bool) {
        if let Some(dev) = self
            .devices
            .lock()
            .iter_mut()
            .find(|d| d.device_path == device_path)
        {
            dev.online = online;
        }
    }

    /// Report a fixed reading instead of the script (`None` restores it)
    pub fn set_reading(&self, reading: Option<BatteryStatus>) {
        *self.reading.lock() = reading;
    }

    /// Number of battery reads requested so far
    pub fn reads(&self) -> u32 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Path the battery server is running on
    pub fn serving_path(&self) -> Option<String> {
        self.route.device_path()
    }

    fn device_online(&self, device_path: &str) -> bool {
        self.devices
            .lock()
            .iter()
            .any(|d| d.device_path == device_path && d.online)
    }
}

impl VendorDriver for MockDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Mock
    }

    fn find_devices(
        &self,
        vid: &str,
        pid: &str,
        _interface_id: i32,
        _device_id: i32,
    ) -> Result<Vec<String>, TransportError> {
        if !self.enumeration {
            return Err(TransportError::EntryPointMissing(
                "CS_UsbFinder_FindHidDevicesByDeviceId",
            ));
        }
        Ok(self
            .devices
            .lock()
            .iter()
            .filter(|d| d.vid.eq_ignore_ascii_case(vid) && d.pid.eq_ignore_ascii_case(pid))
            .map(|d| d.device_path.clone())
            .collect())
    }

    fn is_device_online(&self, device_path: &str) -> bool {
        self.device_online(device_path)
    }

    fn device_address(&self, device_path: &str) -> Option<Vec<u8>> {
        self.devices
            .lock()
            .iter()
            .find(|d| d.device_path == device_path && !d.address.is_empty())
            .map(|d| d.address.clone())
    }

    fn start_server(
        &self,
        device_path: &str,
        events: mpsc::Sender<DriverEvent>,
    ) -> Result<(), TransportError> {
        debug!("Mock battery server started on {device_path}");
        self.route.install(ServerRoute::new(device_path, events));
        Ok(())
    }

    fn stop_server(&self) {
        self.route.clear();
    }

    fn request_battery_level(&self) -> Result<(), TransportError> {
        let path = self
            .route
            .device_path()
            .ok_or(TransportError::ServerNotRunning)?;
        let index = self.reads.fetch_add(1, Ordering::Relaxed);

        // Offline devices swallow the request, like the real driver
        if !self.device_online(&path) {
            return Ok(());
        }

        let status = (*self.reading.lock()).unwrap_or_else(|| fabricated_status(index));
        self.route.dispatch(&[0x00, BATTERY_COMMAND], &status.to_raw());
        Ok(())
    }

    fn decode_battery(&self, data: &[u8]) -> Option<BatteryStatus> {
        BatteryStatus::from_raw(data)
    }
}
