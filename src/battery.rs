//! Battery voltage calibration

use monka_transport::BatteryStatus;
use thiserror::Error;
use tracing::warn;

/// Number of thresholds in a calibration table (0%..=100% in 5% steps)
pub const CALIBRATION_POINTS: usize = 21;

/// Percent per calibration step
const STEP_PERCENT: u32 = 5;

/// Built-in discharge curve (mV)
pub const DEFAULT_THRESHOLDS: [u16; CALIBRATION_POINTS] = [
    3050, 3420, 3480, 3540, 3600, 3660, 3720, 3760, 3800, 3840, 3880, 3920, 3940, 3960, 3980, 4000,
    4020, 4040, 4060, 4080, 4110,
];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CalibrationError {
    #[error("expected {CALIBRATION_POINTS} thresholds, got {0}")]
    WrongLength(usize),

    #[error("threshold {index} ({value} mV) is below its predecessor")]
    Decreasing { index: usize, value: u16 },
}

/// Voltage to percentage lookup with linear interpolation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationTable {
    thresholds: [u16; CALIBRATION_POINTS],
}

impl Default for CalibrationTable {
    fn default() -> Self {
        Self {
            thresholds: DEFAULT_THRESHOLDS,
        }
    }
}

impl CalibrationTable {
    /// Validate a threshold list: exactly 21 non-decreasing entries
    pub fn new(thresholds: &[u16]) -> Result<Self, CalibrationError> {
        let thresholds: [u16; CALIBRATION_POINTS] = thresholds
            .try_into()
            .map_err(|_| CalibrationError::WrongLength(thresholds.len()))?;
        if let Some(index) = (1..CALIBRATION_POINTS).find(|&i| thresholds[i] < thresholds[i - 1]) {
            return Err(CalibrationError::Decreasing {
                index,
                value: thresholds[index],
            });
        }
        Ok(Self { thresholds })
    }

    /// Table from the vendor config, or the built-in one when absent/invalid
    pub fn from_config(thresholds: &[u16]) -> Self {
        if thresholds.is_empty() {
            return Self::default();
        }
        Self::new(thresholds).unwrap_or_else(|e| {
            warn!("Invalid BatteryParam ({e}), using built-in calibration");
            Self::default()
        })
    }

    pub fn thresholds(&self) -> &[u16; CALIBRATION_POINTS] {
        &self.thresholds
    }

    /// Convert a battery voltage (mV) to 0..=100 %
    pub fn percentage(&self, voltage: u16) -> u8 {
        let t = &self.thresholds;
        if voltage >= t[CALIBRATION_POINTS - 1] {
            return 100;
        }
        let Some(i) = t.iter().position(|&threshold| voltage < threshold) else {
            return 100;
        };
        if i == 0 {
            return 0;
        }

        let (lo, hi) = (u32::from(t[i - 1]), u32::from(t[i]));
        let base = (i as u32 - 1) * STEP_PERCENT;
        let pct = base + (u32::from(voltage) - lo) * STEP_PERCENT / (hi - lo);
        pct.min(100) as u8
    }

    /// Level to display for a status: the reported level when non-zero,
    /// else the voltage-derived percentage, else 0
    pub fn effective_level(&self, status: &BatteryStatus) -> u8 {
        if status.level > 0 {
            status.level.min(100)
        } else if status.voltage > 0 {
            self.percentage(status.voltage)
        } else {
            0
        }
    }
}
