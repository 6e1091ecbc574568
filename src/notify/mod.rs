//! Battery alerts: policy plus delivery.
//!
//! - `policy`: hysteresis state machine deciding when an alert fires
//! - `sink`: the `Notifier` trait and the tracing-backed notifier
//! - `dbus`: desktop notifications over `org.freedesktop.Notifications`

#[cfg(feature = "desktop-notify")]
pub mod dbus;
pub mod policy;
pub mod sink;

pub use policy::NotificationPolicy;
pub use sink::{LogNotifier, Notifier, NotifyError};

/// Alert raised by the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    FullCharge,
    LowBattery,
    CriticalBattery,
}

impl AlertKind {
    pub fn title(&self) -> &'static str {
        match self {
            Self::FullCharge => "Battery Full",
            Self::LowBattery => "Low Battery",
            Self::CriticalBattery => "Critical Battery",
        }
    }

    /// Message body for a device
    pub fn body(&self, device_name: &str) -> String {
        match self {
            Self::FullCharge => format!("Your {device_name} is fully charged!"),
            Self::LowBattery => {
                format!("Battery is low (20%). Consider charging your {device_name}.")
            }
            Self::CriticalBattery => {
                format!("Battery is critically low (10%). Please charge your {device_name}.")
            }
        }
    }

    pub fn is_urgent(&self) -> bool {
        matches!(self, Self::CriticalBattery)
    }
}

/// A rendered alert ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub kind: AlertKind,
    pub title: String,
    pub body: String,
    pub battery_level: u8,
    pub charging: bool,
}

impl Alert {
    pub fn new(kind: AlertKind, device_name: &str, battery_level: u8, charging: bool) -> Self {
        Self {
            kind,
            title: kind.title().to_string(),
            body: kind.body(device_name),
            battery_level,
            charging,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_text() {
        let alert = Alert::new(AlertKind::FullCharge, "Monka M1 Pro", 100, true);
        assert_eq!(alert.title, "Battery Full");
        assert_eq!(alert.body, "Your Monka M1 Pro is fully charged!");

        let alert = Alert::new(AlertKind::LowBattery, "Monka M1 Pro", 20, false);
        assert_eq!(alert.title, "Low Battery");
        assert_eq!(
            alert.body,
            "Battery is low (20%). Consider charging your Monka M1 Pro."
        );

        let alert = Alert::new(AlertKind::CriticalBattery, "Monka M2 Pro", 9, false);
        assert_eq!(alert.title, "Critical Battery");
        assert!(alert.body.ends_with("Please charge your Monka M2 Pro."));
        assert!(alert.kind.is_urgent());
    }
}
