//! Monka Battery CLI
//!
//! Discovers Monka mice through the vendor driver, reports battery levels and
//! runs the battery monitor.

use anyhow::Context as _;
use clap::Parser;
use monka_battery::{Settings, VendorConfig};
use tracing::{debug, info};

mod cli;
use cli::{Cli, Commands};

mod commands;
use commands::Context;

fn setup_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    fmt().with_env_filter(filter).with_target(false).init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let settings_path = cli.settings.clone().unwrap_or_else(Settings::default_path);
    let settings = Settings::load(&settings_path)
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;
    debug!("Settings: {}", settings_path.display());

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| settings.vendor_config_path());
    let (vendor, vendor_source) = VendorConfig::load(&config_path);
    info!("Vendor configuration: {vendor_source}");

    let ctx = Context {
        settings,
        settings_path,
        vendor,
        vendor_source,
        force_mock: cli.mock,
    };

    match cli.command {
        None => {
            // Default: run the monitor
            commands::monitor::run(ctx, false, false).await?;
        }
        Some(Commands::Monitor {
            export_status,
            no_notify,
        }) => {
            commands::monitor::run(ctx, export_status, no_notify).await?;
        }
        Some(Commands::List { json }) => {
            commands::query::list(&ctx, json)?;
        }
        Some(Commands::Battery {
            quiet,
            watch,
            timeout,
        }) => {
            commands::query::battery(&ctx, quiet, watch, timeout).await?;
        }
        Some(Commands::Config { write_settings }) => {
            commands::utility::config(&ctx, write_settings)?;
        }
    }

    Ok(())
}
