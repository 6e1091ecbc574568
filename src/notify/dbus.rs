//! Desktop notifications over D-Bus.
//!
//! Bus name: `org.freedesktop.Notifications`
//! Object path: `/org/freedesktop/Notifications`

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;
use zbus::zvariant::Value;

use super::sink::{Notifier, NotifyError};
use super::Alert;

const BUS_NAME: &str = "org.freedesktop.Notifications";
const OBJECT_PATH: &str = "/org/freedesktop/Notifications";
const INTERFACE: &str = "org.freedesktop.Notifications";

const APP_NAME: &str = "Monka Battery";
const ICON_NORMAL: &str = "battery-good";
const ICON_LOW: &str = "battery-caution";
const ICON_FULL: &str = "battery-full-charged";

/// Urgency hint values (freedesktop notifications)
const URGENCY_NORMAL: u8 = 1;
const URGENCY_CRITICAL: u8 = 2;

/// Notifier posting to the session's notification daemon
pub struct DesktopNotifier {
    proxy: zbus::Proxy<'static>,
}

impl DesktopNotifier {
    /// Connect to the session bus and check a notification daemon is running
    pub async fn connect() -> Result<Self, NotifyError> {
        let conn = zbus::Connection::session().await?;
        let proxy = zbus::Proxy::new_owned(conn, BUS_NAME, OBJECT_PATH, INTERFACE).await?;

        let reply = proxy
            .call_method("GetServerInformation", &())
            .await
            .map_err(|e| NotifyError::Unavailable(e.to_string()))?;
        let (name, vendor, version, _spec): (String, String, String, String) =
            reply.body().deserialize()?;
        debug!("Notification server: {name} {version} ({vendor})");

        Ok(Self { proxy })
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn notify(&self, alert: &Alert) -> Result<(), NotifyError> {
        use super::AlertKind;

        let icon = match alert.kind {
            AlertKind::FullCharge => ICON_FULL,
            AlertKind::LowBattery | AlertKind::CriticalBattery if alert.battery_level > 0 => {
                ICON_LOW
            }
            _ => ICON_NORMAL,
        };
        let urgency = if alert.kind.is_urgent() {
            URGENCY_CRITICAL
        } else {
            URGENCY_NORMAL
        };

        let mut hints: HashMap<&str, Value<'_>> = HashMap::new();
        hints.insert("urgency", Value::U8(urgency));

        let actions: Vec<&str> = Vec::new();
        let reply = self
            .proxy
            .call_method(
                "Notify",
                &(
                    APP_NAME,
                    0u32,
                    icon,
                    alert.title.as_str(),
                    alert.body.as_str(),
                    actions,
                    hints,
                    -1i32,
                ),
            )
            .await?;
        let id: u32 = reply.body().deserialize()?;
        debug!("Posted notification id={id}");
        Ok(())
    }
}
