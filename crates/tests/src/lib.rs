//! # Integration Tests
//!
//! End-to-end tests across the workspace crates.
//!
//! Covers:
//! - the full producer -> buffer -> dispatch -> subscriber flow
//! - throttling and requeue behavior under a driven clock
//! - failure archiving and retry replay

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::PackageMode::default();
        let _ = contracts::ShipperConfig::default();
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use buffer_store::{BufferStore, ACTIVE_PIPELINE_TTL};
    use contracts::{DataSubscriber, ManualClock, Package, Payload, ShipperError};
    use dispatcher::{DispatchCoordinator, DispatchOutcome, SubscriberRegistry};
    use failure_ledger::{FailureLedger, MemoryArchive};
    use ingestion::Shipper;
    use parking_lot::Mutex;
    use throttle::ThrottleGate;

    struct RecordingSubscriber {
        name: String,
        failing: AtomicBool,
        shipments: Mutex<Vec<Vec<String>>>,
    }

    impl RecordingSubscriber {
        fn new(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                failing: AtomicBool::new(false),
                shipments: Mutex::new(Vec::new()),
            })
        }

        fn shipments(&self) -> Vec<Vec<String>> {
            self.shipments.lock().clone()
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl DataSubscriber for RecordingSubscriber {
        fn name(&self) -> &str {
            &self.name
        }

        async fn ship(&self, packages: &[Package]) -> Result<(), ShipperError> {
            self.shipments
                .lock()
                .push(packages.iter().map(|p| p.id.clone()).collect());
            if self.failing.load(Ordering::SeqCst) {
                Err(ShipperError::subscriber_ingestion(&self.name, "down"))
            } else {
                Ok(())
            }
        }
    }

    struct World {
        shipper: Shipper,
        coordinator: DispatchCoordinator,
        store: Arc<BufferStore>,
        clock: ManualClock,
    }

    fn world(
        capacity: usize,
        max_per_minute: u32,
        subscribers: &[Arc<RecordingSubscriber>],
    ) -> World {
        let clock = ManualClock::new(90_000);
        let store = Arc::new(BufferStore::new(
            capacity,
            Duration::from_secs(300),
            Arc::new(clock.clone()),
        ));
        let gate = Arc::new(ThrottleGate::new(max_per_minute, Arc::new(clock.clone())));
        let mut registry = SubscriberRegistry::empty();
        for subscriber in subscribers {
            registry.register(subscriber.clone());
        }
        let ledger = Arc::new(FailureLedger::new(
            store.clone(),
            Arc::new(MemoryArchive::new()),
            Arc::new(clock.clone()),
            3,
        ));
        World {
            shipper: Shipper::new(store.clone()),
            coordinator: DispatchCoordinator::new(store.clone(), gate, Arc::new(registry), ledger),
            store,
            clock,
        }
    }

    fn changes(n: usize) -> Vec<Payload> {
        (0..n)
            .map(|i| {
                let mut payload = Payload::new();
                payload.insert("id".to_string(), serde_json::json!(i.to_string()));
                payload.insert("name".to_string(), serde_json::json!(format!("row {i}")));
                payload
            })
            .collect()
    }

    /// End-to-end: Shipper -> BufferStore -> DispatchCoordinator -> subscriber
    ///
    /// Ten changes against a capacity of five force immediate readiness and
    /// a requeue, so the whole backlog drains in one pipeline run.
    #[tokio::test]
    async fn test_e2e_push_dispatch_requeue() {
        let subscriber = RecordingSubscriber::new("search");
        let w = world(5, 10, &[subscriber.clone()]);

        let pushed = w.shipper.push_many("users", changes(10), "id").await.unwrap();
        assert_eq!(pushed, 10);

        // Capacity crossed: ready without waiting for the clock
        assert_eq!(w.store.pending_collections(), vec!["users".to_string()]);

        let outcome = w.coordinator.dispatch_collection("users").await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Shipped { packages: 10 });

        // FIFO across two full shipments
        let shipments = subscriber.shipments();
        assert_eq!(shipments.len(), 2);
        assert_eq!(shipments[0], vec!["0", "1", "2", "3", "4"]);
        assert_eq!(shipments[1], vec!["5", "6", "7", "8", "9"]);

        // Buffer fully garbage-collected
        assert!(!w.store.collection_exists("users"));
        assert!(w.store.pending_collections().is_empty());
    }

    /// A small batch waits out the full window before becoming ready.
    #[tokio::test]
    async fn test_e2e_wait_window_dispatch() {
        let subscriber = RecordingSubscriber::new("search");
        let w = world(10, 10, &[subscriber.clone()]);

        w.shipper.push_many("users", changes(3), "id").await.unwrap();
        assert!(w.store.pending_collections().is_empty());

        w.clock.advance(Duration::from_secs(300));
        assert_eq!(w.coordinator.dispatch_pending().await.unwrap(), 1);
        assert_eq!(subscriber.shipments(), vec![vec!["0", "1", "2"]]);
    }

    /// Throttle: second attempt in the same window is skipped, and the
    /// abandoned active lease blocks the pipeline until it expires.
    #[tokio::test]
    async fn test_e2e_throttle_window() {
        let subscriber = RecordingSubscriber::new("search");
        let w = world(10, 1, &[subscriber.clone()]);

        w.shipper.push_many("users", changes(2), "id").await.unwrap();
        w.clock.advance(Duration::from_secs(300));
        let outcome = w.coordinator.dispatch_collection("users").await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Shipped { packages: 2 });

        // Same window: denied, cooldown lease left behind
        w.shipper.push_many("users", changes(2), "id").await.unwrap();
        let outcome = w.coordinator.dispatch_collection("users").await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Throttled { packages: 0 });
        assert_eq!(
            w.coordinator.dispatch_collection("users").await.unwrap(),
            DispatchOutcome::PipelineActive
        );

        // Past the cooldown and into a fresh minute: dispatch succeeds
        w.clock.advance(ACTIVE_PIPELINE_TTL);
        w.clock.advance(Duration::from_secs(60));
        let outcome = w.coordinator.dispatch_collection("users").await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Shipped { packages: 2 });
        assert_eq!(subscriber.shipments().len(), 2);
    }

    /// Failure isolation and replay: a broken subscriber's shipment lands in
    /// the ledger, the healthy one is unaffected, and recovery drains the
    /// archive on the next sweep.
    #[tokio::test]
    async fn test_e2e_failure_ledger_retry() {
        let healthy = RecordingSubscriber::new("search");
        let broken = RecordingSubscriber::new("warehouse");
        broken.set_failing(true);
        let w = world(10, 10, &[healthy.clone(), broken.clone()]);

        w.shipper.push_many("users", changes(4), "id").await.unwrap();
        w.clock.advance(Duration::from_secs(300));
        w.coordinator.dispatch_collection("users").await.unwrap();

        // Buffer cleared for everyone; only the broken subscriber archived
        assert!(!w.store.collection_exists("users"));
        assert_eq!(healthy.shipments().len(), 1);
        let archive = w.coordinator.ledger().archive();
        assert_eq!(archive.count().await.unwrap(), 1);

        broken.set_failing(false);
        let attempted = w.coordinator.retry_sweep().await.unwrap();
        assert_eq!(attempted, 1);
        assert_eq!(archive.count().await.unwrap(), 0);

        // The replay went only to the subscriber that failed
        assert_eq!(healthy.shipments().len(), 1);
        let replays = broken.shipments();
        assert_eq!(replays.len(), 2);
        assert_eq!(replays[1], vec!["0", "1", "2", "3"]);
    }

    /// Retry budget: a subscriber that never recovers is retried a bounded
    /// number of times, then the record is kept for inspection.
    #[tokio::test]
    async fn test_e2e_retry_budget_exhaustion() {
        let broken = RecordingSubscriber::new("warehouse");
        broken.set_failing(true);
        let w = world(10, 10, &[broken.clone()]);

        w.shipper.push_many("users", changes(1), "id").await.unwrap();
        w.clock.advance(Duration::from_secs(300));
        w.coordinator.dispatch_collection("users").await.unwrap();
        let archive = w.coordinator.ledger().archive();

        // Each sweep consumes one unit of budget after its cooldown
        for _ in 0..4 {
            w.coordinator.retry_sweep().await.unwrap();
            w.clock.advance(Duration::from_secs(15 * 60));
        }

        // Record survives at the cap and is no longer due
        assert_eq!(archive.count().await.unwrap(), 1);
        assert!(w
            .coordinator
            .ledger()
            .due_for_retry(0, 10)
            .await
            .unwrap()
            .is_empty());
        // Initial dispatch, then retries short of the cap
        assert_eq!(broken.shipments().len(), 3);
    }

    /// Config file values drive the engine wiring end to end.
    #[tokio::test]
    async fn test_e2e_config_driven_capacity() {
        let config = config_loader::ConfigLoader::load_from_str(
            r#"
subscribers = ["log"]

[shipments]
max_size = 2
max_wait_minutes = 1
"#,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();
        let core = config.to_shipper_config();

        let clock = ManualClock::new(0);
        let store = Arc::new(BufferStore::new(
            core.max_shipment_size,
            core.max_wait,
            Arc::new(clock.clone()),
        ));
        let shipper = Shipper::new(store.clone());

        shipper.push_many("users", changes(2), "id").await.unwrap();
        // max_size 2 reached: ready immediately
        assert_eq!(store.pending_collections(), vec!["users".to_string()]);
        assert_eq!(store.package_uuids_for_shipment("users").len(), 2);
    }
}
