//! Logical mouse list kept by the monitor

use std::time::Instant;

use monka_transport::LogicalDevice;

use crate::poller::BatteryPoller;

/// Logical mice from the last discovery, with a live battery view
#[derive(Debug, Default, Clone)]
pub struct DeviceList {
    devices: Vec<LogicalDevice>,
}

impl DeviceList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list after a discovery pass.
    ///
    /// A mouse that was marked updating stays so until the switch completes.
    pub fn rebuild(&mut self, mut fresh: Vec<LogicalDevice>) {
        for device in &mut fresh {
            device.updating = self
                .devices
                .iter()
                .any(|old| old.name == device.name && old.updating);
        }
        self.devices = fresh;
    }

    pub fn mark_updating(&mut self, updating: bool) {
        for device in &mut self.devices {
            device.updating = updating;
        }
    }

    /// Pull battery values and liveness from the poller.
    ///
    /// A path that never answered a read keeps the vendor's online flag
    /// from discovery.
    pub fn refresh(&mut self, poller: &BatteryPoller, now: Instant) {
        for device in &mut self.devices {
            for conn in &mut device.connections {
                conn.online = if poller.last_response(&conn.device_path).is_some() {
                    poller.is_online(&conn.device_path, now)
                } else {
                    conn.vendor_online
                };
                if poller.status(&conn.device_path).is_some() {
                    conn.battery_level = poller.battery_level(&conn.device_path);
                    conn.charging = poller.is_charging(&conn.device_path);
                }
            }
        }
    }

    pub fn find_by_path(&self, device_path: &str) -> Option<&LogicalDevice> {
        self.devices.iter().find(|d| d.has_connection(device_path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogicalDevice> {
        self.devices.iter()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battery::CalibrationTable;
    use monka_transport::{
        BatteryStatus, ConnectionInfo, ConnectionType, DriverEvent, MockDevice, MockDriver,
    };
    use std::sync::Arc;
    use std::time::Duration;

    fn conn(path: &str, vendor_online: bool) -> ConnectionInfo {
        ConnectionInfo {
            device_path: path.into(),
            pid: "b00e".into(),
            connection_type: ConnectionType::UsbWired,
            vendor_online,
            online: vendor_online,
            battery_level: 0,
            charging: false,
        }
    }

    fn poller() -> BatteryPoller {
        let driver = Arc::new(MockDriver::with_devices(vec![MockDevice::new(
            "3554", "b00e", "usb", true,
        )]));
        let (poller, _rx) =
            BatteryPoller::new(driver, CalibrationTable::default(), Duration::from_secs(10));
        poller
    }

    #[test]
    fn test_rebuild_keeps_updating_by_name() {
        let mut list = DeviceList::new();
        list.rebuild(vec![LogicalDevice::new("Monka M1 Pro", vec![conn("usb", true)])]);
        list.mark_updating(true);

        list.rebuild(vec![
            LogicalDevice::new("Monka Dongle", vec![conn("dongle", true)]),
            LogicalDevice::new("Monka M1 Pro", vec![conn("bt", true)]),
        ]);
        assert!(!list.find_by_path("dongle").unwrap().updating);
        assert!(list.find_by_path("bt").unwrap().updating);

        list.mark_updating(false);
        assert!(list.iter().all(|d| !d.updating));
    }

    #[test]
    fn test_refresh_from_poller() {
        let mut poller = poller();
        let mut list = DeviceList::new();
        list.rebuild(vec![LogicalDevice::new(
            "Monka M1 Pro",
            vec![conn("usb", false), conn("bt", true)],
        )]);

        let t0 = Instant::now();
        let status = BatteryStatus {
            level: 0,
            charging: true,
            voltage: 4000,
        };
        poller.handle_event(
            DriverEvent::BatteryData {
                device_path: "usb".into(),
                data: status.to_raw().to_vec(),
            },
            t0,
        );

        list.refresh(&poller, t0);
        let mouse = list.find_by_path("usb").unwrap();
        assert!(mouse.connections[0].online);
        assert_eq!(mouse.connections[0].battery_level, 75);
        // never answered, vendor flag still counts
        assert!(mouse.connections[1].online);
        assert_eq!(mouse.battery_level(), 75);
        assert!(mouse.is_charging());

        list.refresh(&poller, t0 + Duration::from_secs(11));
        let mouse = list.find_by_path("usb").unwrap();
        assert!(!mouse.connections[0].online);
        assert_eq!(mouse.connections[0].battery_level, 75);
    }
}
