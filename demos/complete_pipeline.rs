//! Complete Pipeline Demo
//!
//! Wires the full engine in one process: produce changes, let the buffer
//! reach capacity, dispatch to the log subscriber, and print a summary.
//!
//! Run with: cargo run --bin complete_pipeline

use std::sync::Arc;
use std::time::Duration;

use buffer_store::BufferStore;
use config_loader::{ConfigFormat, ConfigLoader};
use contracts::{Clock, Payload, SystemClock};
use dispatcher::{DispatchCoordinator, DispatchOutcome, SubscriberRegistry};
use failure_ledger::{FailureLedger, MemoryArchive};
use ingestion::Shipper;
use observability::DispatchStatsAggregator;
use throttle::ThrottleGate;

const DEMO_CONFIG: &str = r#"
subscribers = ["log"]

[shipments]
max_size = 25
max_wait_minutes = 1
max_shipments_per_minute = 10
max_retries = 3
"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("Starting Complete Pipeline Demo");

    // ==== Stage 1: Load configuration ====
    let config = if let Some(path) = std::env::args().nth(1) {
        tracing::info!(path = %path, "Loading shipper config");
        ConfigLoader::load_from_path(std::path::Path::new(&path))?
    } else {
        ConfigLoader::load_from_str(DEMO_CONFIG, ConfigFormat::Toml)?
    };
    let core = config.to_shipper_config();

    // ==== Stage 2: Wire the engine ====
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let store = Arc::new(BufferStore::new(
        core.max_shipment_size,
        core.max_wait,
        clock.clone(),
    ));
    let gate = Arc::new(ThrottleGate::new(
        core.max_shipments_per_minute,
        clock.clone(),
    ));
    let registry = Arc::new(SubscriberRegistry::from_names(&core.subscribers)?);
    let ledger = Arc::new(FailureLedger::new(
        store.clone(),
        Arc::new(MemoryArchive::new()),
        clock,
        core.max_retries,
    ));
    let shipper = Shipper::new(store.clone());
    let coordinator = DispatchCoordinator::new(store.clone(), gate, registry, ledger);

    // ==== Stage 3: Produce changes ====
    tracing::info!("Producing changes...");
    let changes: Vec<Payload> = (0..60)
        .map(|i| {
            let mut payload = Payload::new();
            payload.insert("id".to_string(), serde_json::json!(i.to_string()));
            payload.insert("name".to_string(), serde_json::json!(format!("user {i}")));
            payload
        })
        .collect();
    let pushed = shipper.push_many("users", changes, "id").await?;
    tracing::info!(pushed, ready = ?store.pending_collections(), "Changes buffered");

    // ==== Stage 4: Dispatch ready collections ====
    let mut stats = DispatchStatsAggregator::new();
    for collection in store.pending_collections() {
        match coordinator.dispatch_collection(&collection).await? {
            DispatchOutcome::Shipped { packages } => stats.record_dispatch(&collection, packages),
            DispatchOutcome::Throttled { packages } => {
                stats.record_dispatch(&collection, packages);
                stats.record_throttled();
            }
            DispatchOutcome::PipelineActive => {}
        }
    }

    // Give the log subscriber's output a moment to flush
    tokio::time::sleep(Duration::from_millis(50)).await;

    // ==== Stage 5: Summary ====
    println!("\n{}", stats.summary());
    Ok(())
}
