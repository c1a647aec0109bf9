//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Data Shipper - change buffering and shipment dispatch engine
#[derive(Parser, Debug)]
#[command(
    name = "data-shipper",
    author,
    version,
    about = "Change buffering and shipment dispatch engine",
    long_about = "Buffers change records per collection, groups them into \n\
                  shipments, and dispatches each shipment to every configured \n\
                  subscriber with throttling and bounded retry of failures."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "DATA_SHIPPER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "DATA_SHIPPER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the dispatch scheduler until interrupted
    Run(RunArgs),

    /// Dispatch every ready collection once and exit
    ShipIt(SweepArgs),

    /// Replay archived failed shipments once and exit
    Retry(SweepArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "data-shipper.toml",
        env = "DATA_SHIPPER_CONFIG"
    )]
    pub config: PathBuf,

    /// Override the Prometheus metrics port from configuration (0 = disabled)
    #[arg(long, env = "DATA_SHIPPER_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the one-shot `ship-it` and `retry` commands
#[derive(Parser, Debug, Clone)]
pub struct SweepArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "data-shipper.toml",
        env = "DATA_SHIPPER_CONFIG"
    )]
    pub config: PathBuf,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "data-shipper.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "data-shipper.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
