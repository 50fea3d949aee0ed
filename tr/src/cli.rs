//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// tabrotor - periodic tab rotation daemon
#[derive(Parser)]
#[command(name = "tr", about = "Periodic tab rotation daemon", version)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the daemon in the foreground
    Run {
        /// Host the engine on the in-memory simulated browser
        #[arg(long)]
        simulate: bool,

        /// Seed the simulated browser with a window of these tabs
        #[arg(long, value_name = "URL")]
        seed: Vec<String>,
    },

    /// Start rotation
    Start {
        /// Base rotation interval in seconds
        #[arg(short, long, default_value_t = 5.0)]
        interval: f64,

        /// Rotate a curated list instead of all open tabs (repeatable)
        #[arg(long, value_name = "URL")]
        url: Vec<String>,

        /// Start options profile (JSON) to use as the base
        #[arg(long, value_name = "FILE")]
        profile: Option<PathBuf>,

        /// Pick the next tab at random instead of in order
        #[arg(long)]
        shuffle: bool,

        /// Confine rotation to a dedicated window
        #[arg(long)]
        dedicated_window: bool,

        /// Comma-separated domains to leave alone
        #[arg(long, value_name = "DOMAINS")]
        exclude: Option<String>,

        /// Disable the countdown badge
        #[arg(long)]
        no_badge: bool,
    },

    /// Stop rotation
    Stop,

    /// Show engine status
    Status,

    /// Check that the daemon is alive
    Ping,
}
