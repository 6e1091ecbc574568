//! Battery polling and liveness tracking
//!
//! Read requests are fire-and-forget; answers come back as driver events on
//! the channel created here and are fed in through
//! [`BatteryPoller::handle_event`] by whoever owns the receiver.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use monka_transport::{event_channel, BatteryStatus, DriverEvent, SharedDriver, TransportError};
use tokio::sync::mpsc;
use tracing::debug;

use crate::battery::CalibrationTable;

/// Runtime state of one device path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceRuntimeState {
    /// Last successfully decoded status
    pub status: Option<BatteryStatus>,
    pub last_response: Option<Instant>,
}

/// Owns per-path battery state and the driver's battery server
pub struct BatteryPoller {
    driver: SharedDriver,
    calibration: CalibrationTable,
    liveness_window: Duration,
    states: HashMap<String, DeviceRuntimeState>,
    events: mpsc::Sender<DriverEvent>,
    serving: Option<String>,
}

impl BatteryPoller {
    /// Create the poller and the receiving end of its driver event channel
    pub fn new(
        driver: SharedDriver,
        calibration: CalibrationTable,
        liveness_window: Duration,
    ) -> (Self, mpsc::Receiver<DriverEvent>) {
        let (events, rx) = event_channel();
        let poller = Self {
            driver,
            calibration,
            liveness_window,
            states: HashMap::new(),
            events,
            serving: None,
        };
        (poller, rx)
    }

    pub fn calibration(&self) -> &CalibrationTable {
        &self.calibration
    }

    /// Path the battery server is running on
    pub fn serving(&self) -> Option<&str> {
        self.serving.as_deref()
    }

    /// Start the battery server on `device_path`
    pub fn start_monitoring(&mut self, device_path: &str) -> Result<(), TransportError> {
        self.driver.start_server(device_path, self.events.clone())?;
        self.serving = Some(device_path.to_string());
        Ok(())
    }

    /// Stop the battery server (safe to call when nothing runs)
    pub fn stop_monitoring(&mut self) {
        self.driver.stop_server();
        self.serving = None;
    }

    /// Fire a battery read on the server for `device_path`.
    ///
    /// The answer arrives later as a driver event. Reads for a path the
    /// server is not running on are dropped.
    pub fn request_battery_level(&self, device_path: &str) {
        if self.serving.as_deref() != Some(device_path) {
            debug!("Battery server not running on {device_path}, skipping read");
            return;
        }
        if let Err(e) = self.driver.request_battery_level() {
            debug!("Battery read request failed: {e}");
        }
    }

    /// Record a driver event.
    ///
    /// Any battery packet counts as a response. Returns the decoded status
    /// when the packet decoded.
    pub fn handle_event(
        &mut self,
        event: DriverEvent,
        now: Instant,
    ) -> Option<(String, BatteryStatus)> {
        let DriverEvent::BatteryData { device_path, data } = event;
        let decoded = self.driver.decode_battery(&data);
        let state = self.states.entry(device_path.clone()).or_default();
        state.last_response = Some(now);

        match decoded {
            Some(status) => {
                debug!(
                    "Battery {device_path}: level={} charging={} voltage={}mV",
                    status.level, status.charging, status.voltage
                );
                state.status = Some(status);
                Some((device_path, status))
            }
            None => {
                debug!("Undecodable battery packet ({} bytes)", data.len());
                None
            }
        }
    }

    pub fn state(&self, device_path: &str) -> Option<&DeviceRuntimeState> {
        self.states.get(device_path)
    }

    pub fn status(&self, device_path: &str) -> Option<BatteryStatus> {
        self.states.get(device_path).and_then(|s| s.status)
    }

    pub fn last_response(&self, device_path: &str) -> Option<Instant> {
        self.states.get(device_path).and_then(|s| s.last_response)
    }

    /// Online iff a response was seen within the liveness window
    pub fn is_online(&self, device_path: &str, now: Instant) -> bool {
        self.last_response(device_path)
            .is_some_and(|t| now.saturating_duration_since(t) < self.liveness_window)
    }

    /// Battery percentage for a path (0 when nothing decoded yet)
    pub fn battery_level(&self, device_path: &str) -> u8 {
        self.status(device_path)
            .map_or(0, |s| self.calibration.effective_level(&s))
    }

    pub fn is_charging(&self, device_path: &str) -> bool {
        self.status(device_path).is_some_and(|s| s.charging)
    }

    /// Voltage to percentage with the configured calibration
    pub fn percentage(&self, voltage: u16) -> u8 {
        self.calibration.percentage(voltage)
    }
}

impl Drop for BatteryPoller {
    fn drop(&mut self) {
        if self.serving.is_some() {
            self.stop_monitoring();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monka_transport::{MockDevice, MockDriver};
    use std::sync::Arc;

    const WINDOW: Duration = Duration::from_secs(10);

    fn poller_with(device: MockDevice) -> (BatteryPoller, mpsc::Receiver<DriverEvent>, Arc<MockDriver>) {
        let driver = Arc::new(MockDriver::with_devices(vec![device]));
        let (poller, rx) = BatteryPoller::new(driver.clone(), CalibrationTable::default(), WINDOW);
        (poller, rx, driver)
    }

    fn packet(path: &str, status: BatteryStatus) -> DriverEvent {
        DriverEvent::BatteryData {
            device_path: path.into(),
            data: status.to_raw().to_vec(),
        }
    }

    #[test]
    fn test_liveness_window() {
        let (mut poller, _rx, _) = poller_with(MockDevice::new("3554", "b00e", "usb", true));
        let t0 = Instant::now();

        assert!(!poller.is_online("usb", t0));

        poller.handle_event(packet("usb", BatteryStatus::default()), t0);
        assert!(poller.is_online("usb", t0));
        assert!(poller.is_online("usb", t0 + Duration::from_millis(9_999)));
        assert!(!poller.is_online("usb", t0 + WINDOW));
        assert!(!poller.is_online("usb", t0 + Duration::from_secs(60)));
    }

    #[test]
    fn test_request_does_not_stamp() {
        let (mut poller, _rx, driver) = poller_with(MockDevice::new("3554", "b00e", "usb", false));
        poller.start_monitoring("usb").unwrap();
        poller.request_battery_level("usb");
        assert_eq!(driver.reads(), 1);
        assert!(poller.last_response("usb").is_none());
    }

    #[test]
    fn test_request_only_on_serving_path() {
        let (mut poller, _rx, driver) = poller_with(MockDevice::new("3554", "b00e", "usb", true));
        poller.request_battery_level("usb");
        assert_eq!(driver.reads(), 0);
        poller.start_monitoring("usb").unwrap();
        poller.request_battery_level("other");
        assert_eq!(driver.reads(), 0);
    }

    #[test]
    fn test_round_trip_through_driver() {
        let (mut poller, mut rx, driver) = poller_with(MockDevice::new("3554", "b00e", "usb", true));
        driver.set_reading(Some(BatteryStatus {
            level: 0,
            charging: true,
            voltage: 4000,
        }));
        poller.start_monitoring("usb").unwrap();
        poller.request_battery_level("usb");

        let event = rx.try_recv().unwrap();
        let now = Instant::now();
        let (path, status) = poller.handle_event(event, now).unwrap();
        assert_eq!(path, "usb");
        assert!(status.charging);
        assert_eq!(poller.battery_level("usb"), 75);
        assert!(poller.is_charging("usb"));
        assert!(poller.is_online("usb", now));
    }

    #[test]
    fn test_short_packet_still_counts_as_response() {
        let (mut poller, _rx, _) = poller_with(MockDevice::new("3554", "b00e", "usb", true));
        let now = Instant::now();
        let event = DriverEvent::BatteryData {
            device_path: "usb".into(),
            data: vec![0x50],
        };
        assert!(poller.handle_event(event, now).is_none());
        assert!(poller.is_online("usb", now));
        assert!(poller.status("usb").is_none());
        assert_eq!(poller.battery_level("usb"), 0);
    }

    #[test]
    fn test_direct_level_wins_over_voltage() {
        let (mut poller, _rx, _) = poller_with(MockDevice::new("3554", "b00e", "usb", true));
        let status = BatteryStatus {
            level: 42,
            charging: false,
            voltage: 4110,
        };
        poller.handle_event(packet("usb", status), Instant::now());
        assert_eq!(poller.battery_level("usb"), 42);
    }

    #[test]
    fn test_stop_monitoring() {
        let (mut poller, _rx, driver) = poller_with(MockDevice::new("3554", "b00e", "usb", true));
        poller.start_monitoring("usb").unwrap();
        assert_eq!(poller.serving(), Some("usb"));
        poller.stop_monitoring();
        assert!(poller.serving().is_none());
        assert!(driver.serving_path().is_none());
    }
}
