//! Edge-triggered battery alerts with hysteresis.
//!
//! Each condition fires once and is re-armed only after it clears: a level
//! swing of more than [`LEVEL_SWING`] points or a charging transition.

use super::AlertKind;

/// Level change (points) that re-arms alerts
pub const LEVEL_SWING: i16 = 5;
/// Consecutive charging-at-100% ticks before "full" fires
pub const FULL_CHARGE_DEBOUNCE: u32 = 8;
pub const LOW_BATTERY_LEVEL: u8 = 20;
pub const CRITICAL_BATTERY_LEVEL: u8 = 10;

/// Notification state for one monitored device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationPolicy {
    pub has_notified_full_charge: bool,
    /// Shared by the low and critical alerts
    pub has_notified_low_battery: bool,
    pub full_charge_counter: u32,
    /// `None` until the first tick
    pub last_level: Option<u8>,
    pub last_charging: Option<bool>,
}

impl NotificationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one battery tick, returning the alert to raise, if any
    pub fn evaluate(&mut self, level: u8, charging: bool) -> Option<AlertKind> {
        if let Some(last) = self.last_level {
            let delta = i16::from(level) - i16::from(last);
            if delta > LEVEL_SWING {
                self.has_notified_low_battery = false;
            } else if delta < -LEVEL_SWING {
                self.has_notified_full_charge = false;
                self.full_charge_counter = 0;
            }
        }

        match self.last_charging {
            Some(false) if charging => {
                self.has_notified_full_charge = false;
                self.full_charge_counter = 0;
            }
            Some(true) if !charging => self.has_notified_low_battery = false,
            _ => {}
        }

        self.last_level = Some(level);
        self.last_charging = Some(charging);

        let mut alert = None;

        if charging && level == 100 {
            self.full_charge_counter += 1;
            if self.full_charge_counter >= FULL_CHARGE_DEBOUNCE && !self.has_notified_full_charge {
                self.has_notified_full_charge = true;
                alert = Some(AlertKind::FullCharge);
            }
        } else {
            self.full_charge_counter = 0;
        }

        if !charging && !self.has_notified_low_battery {
            if level <= CRITICAL_BATTERY_LEVEL {
                self.has_notified_low_battery = true;
                alert = Some(AlertKind::CriticalBattery);
            } else if level <= LOW_BATTERY_LEVEL {
                self.has_notified_low_battery = true;
                alert = Some(AlertKind::LowBattery);
            }
        }

        alert
    }
}
