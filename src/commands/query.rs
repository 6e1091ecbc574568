//! Read-only commands: list, battery

use std::time::{Duration, Instant};

use anyhow::{bail, Context as _};
use monka_battery::{BatteryPoller, CalibrationTable};
use monka_transport::{BatteryStatus, DeviceDiscovery, DiscoveredDevice, LogicalDevice};
use serde::Serialize;

use super::{CommandResult, Context};

#[derive(Serialize)]
struct ListOutput<'a> {
    driver: String,
    devices: &'a [DiscoveredDevice],
    mice: Vec<LogicalDevice>,
}

/// List discovered connections grouped into logical mice
pub fn list(ctx: &Context, json: bool) -> CommandResult {
    let driver = ctx.driver();
    let kind = driver.kind();
    let mut discovery = DeviceDiscovery::new(driver, ctx.vendor.targets());
    discovery.discover();

    if json {
        let output = ListOutput {
            driver: format!("{kind:?}").to_lowercase(),
            devices: discovery.devices(),
            mice: discovery.mouse_items(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if discovery.devices().is_empty() {
        println!("No Monka devices found (driver: {kind:?})");
        return Ok(());
    }

    let preferred = discovery.select_preferred().map(|d| d.device_path.clone());
    println!("Monka devices (driver: {kind:?}):");
    for mouse in discovery.mouse_items() {
        println!("  {}", mouse.name);
        for conn in &mouse.connections {
            let marker = if preferred.as_deref() == Some(conn.device_path.as_str()) {
                "*"
            } else {
                " "
            };
            println!(
                "   {marker} {:<9} pid={} {:<7} {}",
                conn.connection_type.label(),
                conn.pid,
                if conn.online { "online" } else { "offline" },
                conn.device_path
            );
        }
    }
    Ok(())
}

/// Read the battery on the preferred connection, once or repeatedly
pub async fn battery(
    ctx: &Context,
    quiet: bool,
    watch: Option<Option<u64>>,
    timeout: u64,
) -> CommandResult {
    // None = no watch, Some(None) = default interval, Some(Some(n)) = n seconds
    let watch_interval = watch.map(|opt| Duration::from_secs(opt.unwrap_or(5).max(1)));
    let timeout = Duration::from_secs(timeout.max(1));

    let driver = ctx.driver();
    let mut discovery = DeviceDiscovery::new(driver.clone(), ctx.vendor.targets());
    if !discovery.discover() {
        bail!("No Monka devices found");
    }
    let device = discovery
        .select_preferred()
        .cloned()
        .context("No usable connection")?;

    let calibration = CalibrationTable::from_config(&ctx.vendor.battery_param);
    let (mut poller, mut events) =
        BatteryPoller::new(driver, calibration, ctx.settings.liveness_window());
    poller
        .start_monitoring(&device.device_path)
        .with_context(|| format!("Failed to start battery server on {}", device.device_path))?;

    loop {
        poller.request_battery_level(&device.device_path);

        let read = async {
            while let Some(event) = events.recv().await {
                if let Some((_, status)) = poller.handle_event(event, Instant::now()) {
                    return Some(status);
                }
            }
            None
        };

        match tokio::time::timeout(timeout, read).await {
            Ok(Some(status)) => {
                let level = poller.calibration().effective_level(&status);
                if quiet {
                    println!("{level}");
                } else {
                    print_status(&device, level, &status);
                }
            }
            Ok(None) | Err(_) => {
                if watch_interval.is_none() {
                    bail!("No battery response within {}s", timeout.as_secs());
                }
                if !quiet {
                    println!("No battery response within {}s", timeout.as_secs());
                }
            }
        }

        let Some(interval) = watch_interval else {
            break;
        };
        tokio::time::sleep(interval).await;
        if !quiet {
            println!();
        }
    }

    poller.stop_monitoring();
    Ok(())
}

fn print_status(device: &DiscoveredDevice, level: u8, status: &BatteryStatus) {
    println!("Battery Status");
    println!("--------------");
    println!("  Device:     {}", device.name);
    println!("  Connection: {}", device.connection_type.label());
    println!("  Level:      {level}%");
    println!("  Charging:   {}", if status.charging { "Yes" } else { "No" });
    if status.voltage > 0 {
        println!("  Voltage:    {} mV", status.voltage);
    }
}
