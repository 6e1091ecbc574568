//! Common types for the transport layer

use serde::Serialize;

/// Physical connection medium of a discovered device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionType {
    /// Direct USB cable
    UsbWired,
    /// 2.4GHz wireless via USB dongle
    WirelessDongle,
    /// Bluetooth HID
    Bluetooth,
    /// Product id not in the configured mouse or dongle lists
    Unknown,
}

impl ConnectionType {
    /// Check if this connection is wireless
    pub fn is_wireless(&self) -> bool {
        matches!(self, Self::WirelessDongle | Self::Bluetooth)
    }

    /// Short label for display
    pub fn label(&self) -> &'static str {
        match self {
            Self::UsbWired => "USB",
            Self::WirelessDongle => "2.4GHz",
            Self::Bluetooth => "Bluetooth",
            Self::Unknown => "Unknown",
        }
    }
}

/// Vendor/product identifiers handed to the driver's enumeration export.
///
/// Ids are kept as the lowercase hex strings the driver expects
/// (e.g. `"3554"`, `"b00e"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryTargets {
    pub vid: String,
    /// Product ids of the mouse itself (wired or Bluetooth)
    pub mouse_pids: Vec<String>,
    /// Product ids of the wireless receivers
    pub dongle_pids: Vec<String>,
    pub interface_id: i32,
    pub device_id: i32,
}

impl DiscoveryTargets {
    /// All (vid, pid) pairs to enumerate: mouse pids first, then dongle pids
    pub fn combinations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.mouse_pids
            .iter()
            .chain(self.dongle_pids.iter())
            .map(move |pid| (self.vid.as_str(), pid.as_str()))
    }

    pub fn is_mouse_pid(&self, pid: &str) -> bool {
        self.mouse_pids.iter().any(|p| p.eq_ignore_ascii_case(pid))
    }

    pub fn is_dongle_pid(&self, pid: &str) -> bool {
        self.dongle_pids.iter().any(|p| p.eq_ignore_ascii_case(pid))
    }

    /// Numeric (vid, pid) pairs, skipping ids that are not valid hex
    pub fn numeric_pairs(&self) -> Vec<(u16, u16)> {
        let Ok(vid) = u16::from_str_radix(&self.vid, 16) else {
            return Vec::new();
        };
        self.combinations()
            .filter_map(|(_, pid)| u16::from_str_radix(pid, 16).ok())
            .map(|pid| (vid, pid))
            .collect()
    }
}

/// A device path returned by the driver, classified and named
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredDevice {
    /// Display name resolved from the product id
    pub name: String,
    pub vid: String,
    pub pid: String,
    /// Opaque HID device path from the OS
    pub device_path: String,
    pub connection_type: ConnectionType,
    /// Driver liveness flag sampled at discovery time
    pub online: bool,
    /// Device address reported by the driver, if any
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<u8>,
}

/// Decoded battery telemetry for one device path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatteryStatus {
    /// Direct battery level (0 when the device only reports voltage)
    pub level: u8,
    pub charging: bool,
    /// Raw battery voltage in millivolts
    pub voltage: u16,
}

impl BatteryStatus {
    /// Decode the fixed byte layout used when the driver has no decode export
    ///
    /// - byte[0] = level
    /// - byte[1] = charging flag
    /// - byte[2..4] = voltage (little endian, mV)
    pub fn from_raw(data: &[u8]) -> Option<Self> {
        if data.len() < 4 {
            return None;
        }
        Some(Self {
            level: data[0],
            charging: data[1] != 0,
            voltage: u16::from_le_bytes([data[2], data[3]]),
        })
    }

    /// Encode into the fixed byte layout (inverse of [`BatteryStatus::from_raw`])
    pub fn to_raw(&self) -> [u8; 4] {
        let [lo, hi] = self.voltage.to_le_bytes();
        [self.level, u8::from(self.charging), lo, hi]
    }
}

/// Events pushed from the driver callback context to the owning thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    /// Raw battery packet for the device monitoring was started on
    BatteryData { device_path: String, data: Vec<u8> },
}

/// Which driver implementation is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    /// Vendor native library
    Native,
    /// Synthetic data, vendor library unavailable
    Mock,
}
