//! Logical mice: physical connections grouped by product name

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{ConnectionType, DiscoveredDevice};

/// One physical path of a logical mouse
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    pub device_path: String,
    pub pid: String,
    pub connection_type: ConnectionType,
    /// Vendor liveness flag sampled at discovery
    pub vendor_online: bool,
    /// Current online view (refreshed from battery responses by the owner)
    pub online: bool,
    pub battery_level: u8,
    pub charging: bool,
}

impl From<&DiscoveredDevice> for ConnectionInfo {
    fn from(device: &DiscoveredDevice) -> Self {
        Self {
            device_path: device.device_path.clone(),
            pid: device.pid.clone(),
            connection_type: device.connection_type,
            vendor_online: device.online,
            online: device.online,
            battery_level: 0,
            charging: false,
        }
    }
}

/// User-facing mouse aggregating every connection that shares a name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogicalDevice {
    pub name: String,
    pub connections: Vec<ConnectionInfo>,
    /// Set while failover is switching connections
    pub updating: bool,
}

impl LogicalDevice {
    pub fn new(name: impl Into<String>, connections: Vec<ConnectionInfo>) -> Self {
        Self {
            name: name.into(),
            connections,
            updating: false,
        }
    }

    /// Online when any connection is online
    pub fn is_online(&self) -> bool {
        self.connections.iter().any(|c| c.online)
    }

    /// Connection the summary values are taken from.
    ///
    /// Highest level among online connections, a charging one winning ties.
    /// Without any online connection, the first connection's last values.
    pub fn summary_connection(&self) -> Option<&ConnectionInfo> {
        self.connections
            .iter()
            .filter(|c| c.online)
            .max_by_key(|c| (c.battery_level, c.charging))
            .or_else(|| self.connections.first())
    }

    pub fn battery_level(&self) -> u8 {
        self.summary_connection().map_or(0, |c| c.battery_level)
    }

    pub fn is_charging(&self) -> bool {
        self.summary_connection().is_some_and(|c| c.charging)
    }

    pub fn has_connection(&self, device_path: &str) -> bool {
        self.connections.iter().any(|c| c.device_path == device_path)
    }

    pub fn connection_mut(&mut self, device_path: &str) -> Option<&mut ConnectionInfo> {
        self.connections
            .iter_mut()
            .find(|c| c.device_path == device_path)
    }
}

/// Group discovered devices by display name, sorted by name
pub fn group_by_name(devices: &[DiscoveredDevice]) -> Vec<LogicalDevice> {
    let mut groups: BTreeMap<&str, Vec<ConnectionInfo>> = BTreeMap::new();
    for device in devices {
        groups
            .entry(device.name.as_str())
            .or_default()
            .push(ConnectionInfo::from(device));
    }
    groups
        .into_iter()
        .map(|(name, connections)| LogicalDevice::new(name, connections))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(path: &str, online: bool, level: u8, charging: bool) -> ConnectionInfo {
        ConnectionInfo {
            device_path: path.into(),
            pid: "b00e".into(),
            connection_type: ConnectionType::UsbWired,
            vendor_online: online,
            online,
            battery_level: level,
            charging,
        }
    }

    fn device(name: &str, path: &str) -> DiscoveredDevice {
        DiscoveredDevice {
            name: name.into(),
            vid: "3554".into(),
            pid: "b00e".into(),
            device_path: path.into(),
            connection_type: ConnectionType::UsbWired,
            online: true,
            address: Vec::new(),
        }
    }

    #[test]
    fn test_summary_prefers_highest_online() {
        let mouse = LogicalDevice::new(
            "Monka M1 Pro",
            vec![conn("a", true, 40, false), conn("b", true, 70, false), conn("c", false, 99, true)],
        );
        assert!(mouse.is_online());
        assert_eq!(mouse.battery_level(), 70);
        assert!(!mouse.is_charging());
    }

    #[test]
    fn test_summary_charging_wins_tie() {
        let a = conn("a", true, 60, false);
        let b = conn("b", true, 60, true);
        let forward = LogicalDevice::new("m", vec![a.clone(), b.clone()]);
        let reverse = LogicalDevice::new("m", vec![b, a]);
        assert!(forward.is_charging());
        assert!(reverse.is_charging());
        assert_eq!(forward.battery_level(), reverse.battery_level());
    }

    #[test]
    fn test_summary_order_independent() {
        let conns = [
            conn("a", true, 30, true),
            conn("b", true, 55, false),
            conn("c", false, 90, false),
        ];
        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        for order in orders {
            let mouse = LogicalDevice::new("m", order.iter().map(|&i| conns[i].clone()).collect());
            assert_eq!(mouse.battery_level(), 55);
            assert!(!mouse.is_charging());
        }
    }

    #[test]
    fn test_online_connection_beats_higher_offline() {
        let offline = conn("a", false, 80, false);
        let online = conn("b", true, 40, false);
        for conns in [
            vec![offline.clone(), online.clone()],
            vec![online, offline],
        ] {
            let mouse = LogicalDevice::new("m", conns);
            assert!(mouse.is_online());
            assert_eq!(mouse.battery_level(), 40);
        }
    }

    #[test]
    fn test_summary_all_offline_uses_first() {
        let mouse = LogicalDevice::new(
            "m",
            vec![conn("a", false, 20, true), conn("b", false, 80, false)],
        );
        assert!(!mouse.is_online());
        assert_eq!(mouse.battery_level(), 20);
        assert!(mouse.is_charging());
    }

    #[test]
    fn test_empty_device() {
        let mouse = LogicalDevice::new("m", Vec::new());
        assert!(!mouse.is_online());
        assert_eq!(mouse.battery_level(), 0);
        assert!(!mouse.is_charging());
    }

    #[test]
    fn test_group_by_name() {
        let devices = vec![
            device("Monka M1 Pro", "usb"),
            device("Monka Dongle", "dongle"),
            device("Monka M1 Pro", "bt"),
        ];
        let mice = group_by_name(&devices);
        assert_eq!(mice.len(), 2);
        assert_eq!(mice[0].name, "Monka Dongle");
        assert_eq!(mice[1].name, "Monka M1 Pro");
        assert_eq!(mice[1].connections.len(), 2);
        assert!(mice[1].has_connection("bt"));
    }

    #[test]
    fn test_group_by_name_input_order() {
        let a = vec![device("B", "1"), device("A", "2")];
        let b = vec![device("A", "2"), device("B", "1")];
        assert_eq!(group_by_name(&a), group_by_name(&b));
    }
}
