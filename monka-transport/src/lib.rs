//! Transport layer for Monka mice
//!
//! Talks to the vendor's native HID library through the [`VendorDriver`]
//! capability trait:
//!
//! - Native binding (Windows, `hidusb.dll`)
//! - Mock driver (synthetic device, used when the library is unavailable)
//!
//! On top of the driver sit device discovery, connection classification and
//! grouping of physical connections into logical mice.

pub mod device_registry;
pub mod discovery;
pub mod driver;
pub mod error;
pub mod mock;
pub mod mouse;
pub mod route;
pub mod types;

#[cfg(windows)]
mod native;

#[cfg(feature = "hotplug")]
pub mod hotplug;

pub use device_registry::{product_name, COMPANY, FALLBACK_NAME};
pub use discovery::{select_preferred, DeviceDiscovery};
pub use driver::{load_driver, DriverOptions, SharedDriver, VendorDriver, DRIVER_LIBRARY_NAME};
pub use error::TransportError;
pub use mock::{MockDevice, MockDriver};
pub use mouse::{group_by_name, ConnectionInfo, LogicalDevice};
pub use route::{event_channel, BATTERY_COMMAND, EVENT_CHANNEL_CAPACITY};
pub use types::{
    BatteryStatus, ConnectionType, DiscoveredDevice, DiscoveryTargets, DriverEvent, DriverKind,
};

#[cfg(windows)]
pub use native::NativeDriver;

#[cfg(feature = "hotplug")]
pub use hotplug::{PresenceChange, PresenceWatcher};
