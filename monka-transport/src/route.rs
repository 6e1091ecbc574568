//! Routing of driver callback data onto the owning thread
//!
//! The vendor library calls back from its own I/O thread. The callback never
//! touches monitor state; it copies the packet and pushes a [`DriverEvent`]
//! onto a bounded channel drained by the owner.

use parking_lot::{const_mutex, Mutex};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

use crate::types::DriverEvent;

/// Command id (byte 1 of the command buffer) of a battery report
pub const BATTERY_COMMAND: u8 = 0x04;

/// Capacity of the driver event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Create the bounded channel drivers deliver events on
pub fn event_channel() -> (mpsc::Sender<DriverEvent>, mpsc::Receiver<DriverEvent>) {
    mpsc::channel(EVENT_CHANNEL_CAPACITY)
}

/// Destination for packets of the currently running battery server
#[derive(Debug, Clone)]
pub struct ServerRoute {
    device_path: String,
    events: mpsc::Sender<DriverEvent>,
}

impl ServerRoute {
    pub fn new(device_path: impl Into<String>, events: mpsc::Sender<DriverEvent>) -> Self {
        Self {
            device_path: device_path.into(),
            events,
        }
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Forward a callback payload if it is a battery report.
    ///
    /// Returns true when an event was queued.
    pub fn dispatch(&self, cmd: &[u8], data: &[u8]) -> bool {
        if cmd.len() < 2 || cmd[1] != BATTERY_COMMAND || data.is_empty() {
            return false;
        }

        let event = DriverEvent::BatteryData {
            device_path: self.device_path.clone(),
            data: data.to_vec(),
        };

        match self.events.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("Driver event channel full, dropping battery packet");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Driver event channel closed");
                false
            }
        }
    }
}

/// Slot holding the active route, shared with a callback context
#[derive(Debug, Default)]
pub struct RouteSlot {
    route: Mutex<Option<ServerRoute>>,
}

impl RouteSlot {
    pub const fn new() -> Self {
        Self {
            route: const_mutex(None),
        }
    }

    pub fn install(&self, route: ServerRoute) {
        *self.route.lock() = Some(route);
    }

    pub fn clear(&self) {
        self.route.lock().take();
    }

    /// Path of the device the installed route delivers for
    pub fn device_path(&self) -> Option<String> {
        self.route.lock().as_ref().map(|r| r.device_path.clone())
    }

    pub fn is_active(&self) -> bool {
        self.route.lock().is_some()
    }

    /// Dispatch through the installed route, if any
    pub fn dispatch(&self, cmd: &[u8], data: &[u8]) -> bool {
        match self.route.lock().as_ref() {
            Some(route) => route.dispatch(cmd, data),
            None => false,
        }
    }
}
