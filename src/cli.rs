// CLI definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "monka-battery")]
#[command(author, version, about = "Battery monitor for Monka wireless mice")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Settings file (default: <config dir>/monka-battery/settings.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Vendor Config.ini (overrides the settings file)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Use synthetic device data instead of the vendor driver
    #[arg(long, global = true)]
    pub mock: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Monitor battery, fail over between connections and raise alerts (default)
    #[command(visible_alias = "m")]
    Monitor {
        /// Write status files (capacity, status, online, updating)
        #[arg(long)]
        export_status: bool,
        /// Disable battery alerts
        #[arg(long)]
        no_notify: bool,
    },

    /// List discovered connections and logical mice
    #[command(visible_aliases = ["ls", "l"])]
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Read the battery once on the preferred connection
    #[command(visible_aliases = ["bat", "b"])]
    Battery {
        /// Print only battery percentage (for scripts)
        #[arg(short, long)]
        quiet: bool,
        /// Continuously monitor (interval in seconds, default: 5)
        #[arg(short, long)]
        watch: Option<Option<u64>>,
        /// Seconds to wait for the device to answer
        #[arg(short, long, default_value_t = 5)]
        timeout: u64,
    },

    /// Show effective vendor configuration and settings
    #[command(visible_alias = "cfg")]
    Config {
        /// Write the effective settings to the settings file
        #[arg(long)]
        write_settings: bool,
    },
}
