//! Engine wiring - builds the dispatch components from configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use buffer_store::BufferStore;
use config_loader::ShipperFileConfig;
use contracts::{Clock, SystemClock};
use dispatcher::{DispatchCoordinator, SubscriberRegistry};
use failure_ledger::{FailureLedger, MemoryArchive};
use ingestion::Shipper;
use throttle::ThrottleGate;

/// Fully wired dispatch engine for one process
pub struct Engine {
    pub shipper: Shipper,
    pub coordinator: Arc<DispatchCoordinator>,
}

/// Build the engine from a loaded configuration
pub fn build_engine(config: &ShipperFileConfig) -> Result<Engine> {
    let core = config.to_shipper_config();
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
    let registry = Arc::new(
        SubscriberRegistry::from_names(&core.subscribers)
            .context("Failed to resolve configured subscribers")?,
    );
    let ledger = Arc::new(FailureLedger::new(
        store.clone(),
        Arc::new(MemoryArchive::new()),
        clock,
        core.max_retries,
    ));

    Ok(Engine {
        shipper: Shipper::new(store.clone()),
        coordinator: Arc::new(DispatchCoordinator::new(store, gate, registry, ledger)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_loader::{ConfigFormat, ConfigLoader};

    #[test]
    fn test_build_engine_from_minimal_config() {
        let config =
            ConfigLoader::load_from_str("subscribers = [\"log\"]", ConfigFormat::Toml).unwrap();
        let engine = build_engine(&config).unwrap();
        assert_eq!(engine.coordinator.registry().len(), 1);
        assert_eq!(engine.shipper.store().capacity(), 10);
    }

    #[test]
    fn test_build_engine_rejects_unknown_subscriber() {
        let config =
            ConfigLoader::load_from_str("subscribers = [\"elastic\"]", ConfigFormat::Toml).unwrap();
        assert!(build_engine(&config).is_err());
    }
}
