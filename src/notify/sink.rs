//! Alert delivery

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use super::Alert;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[cfg(feature = "desktop-notify")]
    #[error("D-Bus error: {0}")]
    DBus(#[from] zbus::Error),

    #[error("notification service unavailable: {0}")]
    Unavailable(String),
}

/// Something that can show an alert to the user
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alert: &Alert) -> Result<(), NotifyError>;
}

/// Writes alerts to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, alert: &Alert) -> Result<(), NotifyError> {
        if alert.kind.is_urgent() {
            warn!("{}: {}", alert.title, alert.body);
        } else {
            info!("{}: {}", alert.title, alert.body);
        }
        Ok(())
    }
}
