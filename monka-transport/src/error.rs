//! Transport error types

use thiserror::Error;

/// Errors that can occur while talking to the vendor driver
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Driver library not found: {0}")]
    LibraryNotFound(String),

    #[error("Driver entry point not available: {0}")]
    EntryPointMissing(&'static str),

    #[error("Invalid device path: {0}")]
    InvalidPath(String),

    #[error("Battery server not running")]
    ServerNotRunning,

    // HID-specific errors
    #[error("HID error: {0}")]
    HidError(String),

    #[error("Unsupported on this platform: {0}")]
    Unsupported(&'static str),
}

#[cfg(feature = "hotplug")]
impl From<hidapi::HidError> for TransportError {
    fn from(e: hidapi::HidError) -> Self {
        TransportError::HidError(e.to_string())
    }
}
