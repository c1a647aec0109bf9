//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use dispatcher::{Scheduler, SchedulerConfig};

use crate::app::build_engine;
use crate::cli::RunArgs;
use crate::error::CliError;

/// Execute the `run` command
pub async fn run_scheduler(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        subscribers = ?config.subscribers,
        max_size = config.shipments.max_size,
        max_wait_minutes = config.shipments.max_wait_minutes,
        max_shipments_per_minute = config.shipments.max_shipments_per_minute,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    // Metrics endpoint: CLI override wins, 0 disables
    let metrics_port = match args.metrics_port {
        Some(0) => None,
        Some(port) => Some(port),
        None => config.observability.metrics_port,
    };
    if let Some(port) = metrics_port {
        observability::init_metrics_only(port)?;
        info!("Metrics endpoint available on port {}", port);
    }

    let engine = build_engine(&config)?;
    let scheduler = Scheduler::new(
        engine.coordinator.clone(),
        SchedulerConfig {
            ship_interval: Duration::from_secs(config.scheduler.ship_interval_secs),
            retry_interval: Duration::from_secs(config.scheduler.retry_interval_secs),
        },
    );

    info!("Starting dispatch scheduler...");
    let handle = scheduler.spawn();

    shutdown_signal().await;
    warn!("Received shutdown signal, stopping scheduler...");
    handle.abort();

    // Drain whatever is ready before exiting
    match engine.coordinator.dispatch_pending().await {
        Ok(dispatched) => info!(collections = dispatched, "Final drain complete"),
        Err(e) => warn!(error = %e, "Final drain failed"),
    }

    info!("Data shipper finished");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &config_loader::ShipperFileConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Subscribers ({}):", config.subscribers.len());
    for subscriber in &config.subscribers {
        println!("  - {}", subscriber);
    }
    println!("\nShipments:");
    println!("  Max size: {}", config.shipments.max_size);
    println!("  Max wait: {} min", config.shipments.max_wait_minutes);
    println!(
        "  Max per minute: {}",
        config.shipments.max_shipments_per_minute
    );
    println!("  Max retries: {}", config.shipments.max_retries);
    println!("\nScheduler:");
    println!("  Ship interval: {}s", config.scheduler.ship_interval_secs);
    println!(
        "  Retry interval: {}s",
        config.scheduler.retry_interval_secs
    );
    println!();
}
