//! Long-running monitor command

use anyhow::Context as _;
use monka_battery::{LogNotifier, Monitor, Notifier, StatusExport};
use tracing::info;

use super::{CommandResult, Context};

pub async fn run(ctx: Context, export_status: bool, no_notify: bool) -> CommandResult {
    let mut settings = ctx.settings.clone();
    if no_notify {
        settings.notifications_enabled = false;
    }
    let export_status = export_status || settings.export_status;
    let status_dir = settings.status_dir();

    let driver = ctx.driver();
    let notifier = notifier(settings.notifications_enabled).await;

    let mut monitor = Monitor::new(driver, &ctx.vendor, settings, notifier);
    if export_status {
        let export = StatusExport::new(&status_dir)
            .with_context(|| format!("Failed to export status to {}", status_dir.display()))?;
        info!("Status files in {}", export.path().display());
        monitor = monitor.with_export(export);
    }

    monitor.run().await;
    Ok(())
}

#[cfg(feature = "desktop-notify")]
async fn notifier(enabled: bool) -> Box<dyn Notifier> {
    use monka_battery::notify::dbus::DesktopNotifier;

    if !enabled {
        return Box::new(LogNotifier);
    }
    match DesktopNotifier::connect().await {
        Ok(notifier) => Box::new(notifier),
        Err(e) => {
            tracing::warn!("Desktop notifications unavailable ({e}), logging alerts instead");
            Box::new(LogNotifier)
        }
    }
}

#[cfg(not(feature = "desktop-notify"))]
async fn notifier(_enabled: bool) -> Box<dyn Notifier> {
    Box::new(LogNotifier)
}
