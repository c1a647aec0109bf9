//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    subscribers: Vec<String>,
    shipments: ShipmentsInfo,
    scheduler: SchedulerInfo,
    observability: ObservabilityInfo,
}

#[derive(Serialize)]
struct ShipmentsInfo {
    max_size: usize,
    max_wait_minutes: u64,
    max_shipments_per_minute: u32,
    max_retries: u32,
}

#[derive(Serialize)]
struct SchedulerInfo {
    ship_interval_secs: u64,
    retry_interval_secs: u64,
}

#[derive(Serialize)]
struct ObservabilityInfo {
    log_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics_port: Option<u16>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&config);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config);
    }

    Ok(())
}

fn build_config_info(config: &config_loader::ShipperFileConfig) -> ConfigInfo {
    ConfigInfo {
        subscribers: config.subscribers.clone(),
        shipments: ShipmentsInfo {
            max_size: config.shipments.max_size,
            max_wait_minutes: config.shipments.max_wait_minutes,
            max_shipments_per_minute: config.shipments.max_shipments_per_minute,
            max_retries: config.shipments.max_retries,
        },
        scheduler: SchedulerInfo {
            ship_interval_secs: config.scheduler.ship_interval_secs,
            retry_interval_secs: config.scheduler.retry_interval_secs,
        },
        observability: ObservabilityInfo {
            log_format: config.observability.log_format.clone(),
            metrics_port: config.observability.metrics_port,
        },
    }
}

fn print_config_info(config: &config_loader::ShipperFileConfig) {
    println!("=== Data Shipper Configuration ===\n");

    println!("Subscribers ({})", config.subscribers.len());
    for (i, subscriber) in config.subscribers.iter().enumerate() {
        let is_last = i == config.subscribers.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        println!("   {} {}", prefix, subscriber);
    }

    println!("\nShipments");
    println!("   ├─ Max size: {}", config.shipments.max_size);
    println!("   ├─ Max wait: {} min", config.shipments.max_wait_minutes);
    println!(
        "   ├─ Max per minute: {}",
        config.shipments.max_shipments_per_minute
    );
    println!("   └─ Max retries: {}", config.shipments.max_retries);

    println!("\nScheduler");
    println!(
        "   ├─ Ship interval: {}s",
        config.scheduler.ship_interval_secs
    );
    println!(
        "   └─ Retry interval: {}s",
        config.scheduler.retry_interval_secs
    );

    println!("\nObservability");
    println!("   ├─ Log format: {}", config.observability.log_format);
    match config.observability.metrics_port {
        Some(port) => println!("   └─ Metrics port: {}", port),
        None => println!("   └─ Metrics: disabled"),
    }

    println!();
}
