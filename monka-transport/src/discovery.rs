//! Device discovery for Monka mice

use tracing::{debug, info, warn};

use crate::device_registry;
use crate::driver::SharedDriver;
use crate::mouse::{group_by_name, LogicalDevice};
use crate::types::{ConnectionType, DiscoveredDevice, DiscoveryTargets};

/// Enumerates configured vid/pid pairs through the vendor driver
pub struct DeviceDiscovery {
    driver: SharedDriver,
    targets: DiscoveryTargets,
    devices: Vec<DiscoveredDevice>,
}

impl DeviceDiscovery {
    pub fn new(driver: SharedDriver, targets: DiscoveryTargets) -> Self {
        Self {
            driver,
            targets,
            devices: Vec::new(),
        }
    }

    pub fn driver(&self) -> &SharedDriver {
        &self.driver
    }

    pub fn targets(&self) -> &DiscoveryTargets {
        &self.targets
    }

    /// Classify a path by product id
    ///
    /// Dongle pids are always the 2.4GHz receiver. A mouse pid is wired when
    /// the OS path goes through the USB stack, Bluetooth otherwise.
    pub fn connection_type(&self, pid: &str, device_path: &str) -> ConnectionType {
        if self.targets.is_dongle_pid(pid) {
            ConnectionType::WirelessDongle
        } else if self.targets.is_mouse_pid(pid) {
            if device_path.to_lowercase().contains("usb") {
                ConnectionType::UsbWired
            } else {
                ConnectionType::Bluetooth
            }
        } else {
            ConnectionType::Unknown
        }
    }

    /// Re-enumerate every configured pair, replacing the device list.
    ///
    /// Returns false (with an empty list) when enumeration is unavailable or
    /// nothing was found.
    pub fn discover(&mut self) -> bool {
        self.devices.clear();

        let mut found = Vec::new();
        for (vid, pid) in self.targets.combinations() {
            let paths = match self.driver.find_devices(
                vid,
                pid,
                self.targets.interface_id,
                self.targets.device_id,
            ) {
                Ok(paths) => paths,
                Err(e) => {
                    warn!("Device enumeration unavailable: {e}");
                    return false;
                }
            };

            for device_path in paths {
                let online = self.driver.is_device_online(&device_path);
                let address = self.driver.device_address(&device_path).unwrap_or_default();
                let connection_type = self.connection_type(pid, &device_path);
                debug!(
                    "Found {vid}:{pid} ({}) online={online} at {device_path}",
                    connection_type.label()
                );
                found.push(DiscoveredDevice {
                    name: device_registry::product_name(pid).to_string(),
                    vid: vid.to_string(),
                    pid: pid.to_string(),
                    device_path,
                    connection_type,
                    online,
                    address,
                });
            }
        }

        if found.is_empty() {
            info!("No devices found");
            return false;
        }

        info!("Discovered {} device path(s)", found.len());
        self.devices = found;
        true
    }

    /// Devices from the last discovery pass
    pub fn devices(&self) -> &[DiscoveredDevice] {
        &self.devices
    }

    /// Last discovery pass grouped into logical mice
    pub fn mouse_items(&self) -> Vec<LogicalDevice> {
        group_by_name(&self.devices)
    }

    /// Preferred connection among the discovered devices
    ///
    /// Wired and online, then the first online dongle, then anything online,
    /// then the first discovered path.
    pub fn select_preferred(&self) -> Option<&DiscoveredDevice> {
        select_preferred(&self.devices)
    }
}

/// Pick the connection to monitor (see [`DeviceDiscovery::select_preferred`])
pub fn select_preferred(devices: &[DiscoveredDevice]) -> Option<&DiscoveredDevice> {
    devices
        .iter()
        .find(|d| d.online && d.connection_type == ConnectionType::UsbWired)
        .or_else(|| {
            devices
                .iter()
                .find(|d| d.online && d.connection_type == ConnectionType::WirelessDongle)
        })
        .or_else(|| devices.iter().find(|d| d.online))
        .or_else(|| devices.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockDevice, MockDriver};
    use std::sync::Arc;

    fn targets() -> DiscoveryTargets {
        DiscoveryTargets {
            vid: "3554".into(),
            mouse_pids: vec!["b00e".into(), "b00f".into()],
            dongle_pids: vec!["b012".into(), "b013".into()],
            interface_id: 0,
            device_id: 0,
        }
    }

    fn discovery(devices: Vec<MockDevice>) -> DeviceDiscovery {
        DeviceDiscovery::new(Arc::new(MockDriver::with_devices(devices)), targets())
    }

    #[test]
    fn test_connection_type() {
        let d = discovery(Vec::new());
        assert_eq!(
            d.connection_type("b00e", r"\\?\HID#VID_3554&PID_B00E#USB"),
            ConnectionType::UsbWired
        );
        assert_eq!(
            d.connection_type("b00e", r"\\?\hid#{00001124-0000}_vid&0002"),
            ConnectionType::Bluetooth
        );
        assert_eq!(
            d.connection_type("b012", "anything-usb"),
            ConnectionType::WirelessDongle
        );
        assert_eq!(d.connection_type("ffff", "usb"), ConnectionType::Unknown);
    }

    #[test]
    fn test_discover_classifies_and_names() {
        let mut d = discovery(vec![
            MockDevice::new("3554", "b00e", "usb-wired", true),
            MockDevice::new("3554", "b012", "dongle-path", false),
        ]);
        assert!(d.discover());
        let devices = d.devices();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].name, "Monka M1 Pro");
        assert_eq!(devices[0].connection_type, ConnectionType::UsbWired);
        assert!(devices[0].online);
        assert_eq!(devices[1].name, "Monka Dongle");
        assert_eq!(devices[1].connection_type, ConnectionType::WirelessDongle);
        assert!(!devices[1].online);
    }

    #[test]
    fn test_discover_nothing_found() {
        let mut d = discovery(Vec::new());
        assert!(!d.discover());
        assert!(d.devices().is_empty());
    }

    #[test]
    fn test_discover_without_enumeration() {
        let mut d = DeviceDiscovery::new(Arc::new(MockDriver::without_enumeration()), targets());
        assert!(!d.discover());
        assert!(d.devices().is_empty());
    }

    #[test]
    fn test_rediscover_replaces_list() {
        let driver = Arc::new(MockDriver::with_devices(vec![MockDevice::new(
            "3554", "b00e", "usb-1", true,
        )]));
        let mut d = DeviceDiscovery::new(driver.clone(), targets());
        assert!(d.discover());
        driver.set_devices(Vec::new());
        assert!(!d.discover());
        assert!(d.devices().is_empty());
    }

    #[test]
    fn test_select_preferred_order() {
        let mut d = discovery(vec![
            MockDevice::new("3554", "b00e", "bt-path", true),
            MockDevice::new("3554", "b012", "dongle-a", true),
            MockDevice::new("3554", "b013", "dongle-b", true),
            MockDevice::new("3554", "b00f", "usb-wired", false),
        ]);
        d.discover();
        // wired is offline, so the first online dongle wins
        assert_eq!(d.select_preferred().unwrap().device_path, "dongle-a");
    }

    #[test]
    fn test_select_preferred_falls_back_to_first() {
        let mut d = discovery(vec![
            MockDevice::new("3554", "b012", "dongle-a", false),
            MockDevice::new("3554", "b00e", "usb-wired", false),
        ]);
        d.discover();
        // mouse pids are enumerated first
        assert_eq!(d.select_preferred().unwrap().device_path, "usb-wired");
    }

    #[test]
    fn test_select_preferred_wired_first() {
        let mut d = discovery(vec![
            MockDevice::new("3554", "b012", "dongle-a", true),
            MockDevice::new("3554", "b00e", "usb-wired", true),
        ]);
        d.discover();
        assert_eq!(d.select_preferred().unwrap().device_path, "usb-wired");
    }
}
