//! One-shot `ship-it` and `retry` command implementations.

use anyhow::{Context, Result};
use tracing::info;

use crate::app::build_engine;
use crate::cli::SweepArgs;
use crate::error::CliError;

/// Execute the `ship-it` command: dispatch every ready collection once
pub async fn run_ship_sweep(args: &SweepArgs) -> Result<()> {
    let engine = load_engine(args)?;
    let dispatched = engine
        .coordinator
        .dispatch_pending()
        .await
        .map_err(|e| CliError::dispatch(e.to_string()))?;
    info!(collections = dispatched, "Ship sweep complete");
    println!("Dispatched {} ready collection(s)", dispatched);
    Ok(())
}

/// Execute the `retry` command: replay archived failed shipments once
pub async fn run_retry_sweep(args: &SweepArgs) -> Result<()> {
    let engine = load_engine(args)?;
    let attempted = engine
        .coordinator
        .retry_sweep()
        .await
        .map_err(|e| CliError::dispatch(e.to_string()))?;
    info!(attempted, "Retry sweep complete");
    println!("Attempted {} archived shipment(s)", attempted);
    Ok(())
}

fn load_engine(args: &SweepArgs) -> Result<crate::app::Engine> {
    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }
    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    build_engine(&config)
}
