//! Utility commands: config

use anyhow::Context as _;
use monka_battery::{CalibrationTable, DEFAULT_THRESHOLDS};

use super::{CommandResult, Context};

/// Print the effective vendor configuration and settings
pub fn config(ctx: &Context, write_settings: bool) -> CommandResult {
    let vendor = &ctx.vendor;
    let calibration = CalibrationTable::from_config(&vendor.battery_param);
    let custom = calibration.thresholds() != &DEFAULT_THRESHOLDS;

    println!("Vendor configuration ({})", ctx.vendor_source);
    println!("-------------------------");
    println!("  Company:      {}", vendor.company);
    println!("  VID:          {}", vendor.vid);
    println!("  Mouse PIDs:   {}", vendor.mouse_pids.join(", "));
    println!("  Dongle PIDs:  {}", vendor.dongle_pids.join(", "));
    println!("  Interface ID: {}", vendor.interface_id);
    println!("  Device ID:    {}", vendor.device_id);
    println!(
        "  Calibration:  {} ({} .. {} mV)",
        if custom { "custom" } else { "default" },
        calibration.thresholds()[0],
        calibration.thresholds()[DEFAULT_THRESHOLDS.len() - 1]
    );
    println!();

    println!("Settings ({})", ctx.settings_path.display());
    println!("-------------------------");
    let rendered = toml::to_string_pretty(&ctx.settings).context("Failed to render settings")?;
    for line in rendered.lines() {
        println!("  {line}");
    }

    if write_settings {
        ctx.settings
            .save(&ctx.settings_path)
            .with_context(|| format!("Failed to write {}", ctx.settings_path.display()))?;
        println!();
        println!("Settings written to {}", ctx.settings_path.display());
    }
    Ok(())
}
