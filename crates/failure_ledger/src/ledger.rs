//! Failure recording and bounded retry

use std::sync::Arc;
use std::time::Duration;

use buffer_store::BufferStore;
use contracts::{Clock, DataSubscriber, ShipperError};
use metrics::counter;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::archive::ArchiveStore;
use crate::model::{FailedPackage, FailedShipment};

/// Wait between retry attempts of the same shipment
pub const RETRY_COOLDOWN: Duration = Duration::from_secs(15 * 60);

/// Shipments fetched per retry sweep page
pub const RETRY_PAGE_SIZE: usize = 250;

/// Result of one retry attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// Subscriber accepted the replay; the record is gone
    Reshipped,
    /// Retry budget exhausted; the record stays for inspection
    CapReached,
    /// Subscriber failed again; the record stays and cools down
    Failed,
}

/// Records shipments a subscriber rejected and replays them later
///
/// Snapshots are taken before the buffer is cleared, so a recorded shipment
/// is self-contained. The retry counter is advanced before the replay is
/// attempted: a subscriber that hangs or crashes the process still consumes
/// budget and cannot be retried forever.
pub struct FailureLedger {
    store: Arc<BufferStore>,
    archive: Arc<dyn ArchiveStore>,
    clock: Arc<dyn Clock>,
    max_retries: u32,
}

impl FailureLedger {
    pub fn new(
        store: Arc<BufferStore>,
        archive: Arc<dyn ArchiveStore>,
        clock: Arc<dyn Clock>,
        max_retries: u32,
    ) -> Self {
        Self {
            store,
            archive,
            clock,
            max_retries,
        }
    }

    pub fn archive(&self) -> &Arc<dyn ArchiveStore> {
        &self.archive
    }

    /// Snapshot a failed shipment into the archive
    ///
    /// Reads the still-buffered packages for `uuids` and stores them with
    /// the name of the one subscriber that failed. Uuids already cleared
    /// from the buffer are skipped; an entirely empty snapshot records
    /// nothing.
    #[instrument(name = "ledger_record", skip(self, uuids), fields(collection = %collection, subscriber = %subscriber, count = uuids.len()))]
    pub async fn record(
        &self,
        collection: &str,
        subscriber: &str,
        uuids: &[Uuid],
    ) -> Result<Option<Uuid>, ShipperError> {
        let packages = self.store.packages_by_uuids(collection, uuids)?;
        if packages.is_empty() {
            return Ok(None);
        }

        let snapshots = packages
            .into_iter()
            .map(|package| FailedPackage {
                model_id: package.id,
                payload: package.payload,
            })
            .collect();
        let shipment = FailedShipment::new(collection, subscriber, snapshots);
        let id = shipment.id;
        self.archive.create(shipment).await?;

        counter!("shipper_shipments_failed", "subscriber" => subscriber.to_string()).increment(1);
        warn!(collection = %collection, subscriber = %subscriber, shipment = %id, "failed shipment archived");
        Ok(Some(id))
    }

    /// One page of shipments whose cooldown has passed and whose retry
    /// budget is not exhausted
    pub async fn due_for_retry(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<FailedShipment>, ShipperError> {
        self.archive
            .due_for_retry(self.max_retries, RETRY_COOLDOWN, self.clock.now(), offset, limit)
            .await
    }

    /// Replay one failed shipment against its subscriber
    ///
    /// Budget is consumed up front. A replay that lands at the cap marks
    /// the shipment exhausted without contacting the subscriber again.
    #[instrument(name = "ledger_retry", skip(self, shipment, subscriber), fields(shipment = %shipment.id, subscriber = %shipment.subscriber, attempt = shipment.retries + 1))]
    pub async fn retry(
        &self,
        shipment: &FailedShipment,
        subscriber: &dyn DataSubscriber,
    ) -> Result<RetryOutcome, ShipperError> {
        let retries = shipment.retries + 1;
        self.archive
            .mark_retried(shipment.id, retries, self.clock.now())
            .await?;

        if retries >= self.max_retries {
            warn!(shipment = %shipment.id, retries, "retry budget exhausted");
            counter!("shipper_retries_exhausted").increment(1);
            return Ok(RetryOutcome::CapReached);
        }

        counter!("shipper_retries_attempted", "subscriber" => shipment.subscriber.clone())
            .increment(1);
        let packages = shipment.rebuild_packages();
        match subscriber.ship(&packages).await {
            Ok(()) => {
                self.archive.delete(shipment.id).await?;
                info!(shipment = %shipment.id, packages = packages.len(), "failed shipment replayed");
                Ok(RetryOutcome::Reshipped)
            }
            Err(error) => {
                warn!(shipment = %shipment.id, %error, "retry failed");
                Ok(RetryOutcome::Failed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchive;
    use async_trait::async_trait;
    use contracts::{ManualClock, Package, PackageMode, Payload};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FlakySubscriber {
        calls: AtomicUsize,
        failing: AtomicBool,
    }

    impl FlakySubscriber {
        fn new(failing: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failing: AtomicBool::new(failing),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DataSubscriber for FlakySubscriber {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn ship(&self, _packages: &[Package]) -> Result<(), ShipperError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                Err(ShipperError::subscriber_ingestion("flaky", "down"))
            } else {
                Ok(())
            }
        }
    }

    fn make_ledger(max_retries: u32) -> (FailureLedger, Arc<BufferStore>, ManualClock) {
        let clock = ManualClock::new(1_000_000);
        let store = Arc::new(BufferStore::new(
            10,
            Duration::from_secs(300),
            Arc::new(clock.clone()),
        ));
        let ledger = FailureLedger::new(
            store.clone(),
            Arc::new(MemoryArchive::new()),
            Arc::new(clock.clone()),
            max_retries,
        );
        (ledger, store, clock)
    }

    async fn buffer_packages(store: &BufferStore, n: usize) -> Vec<Uuid> {
        let packages: Vec<Package> = (0..n)
            .map(|i| {
                let mut payload = Payload::new();
                payload.insert("v".to_string(), serde_json::json!(i));
                Package::new(i.to_string(), payload, "users", PackageMode::Update)
            })
            .collect();
        store.push("users", &packages).await.unwrap();
        packages.iter().map(|p| p.uuid).collect()
    }

    #[tokio::test]
    async fn test_record_snapshots_buffered_packages() {
        let (ledger, store, _clock) = make_ledger(3);
        let uuids = buffer_packages(&store, 3).await;

        let id = ledger.record("users", "flaky", &uuids).await.unwrap().unwrap();
        let stored = ledger.archive().get(id).await.unwrap().unwrap();
        assert_eq!(stored.collection, "users");
        assert_eq!(stored.subscriber, "flaky");
        assert_eq!(stored.retries, 0);
        assert_eq!(stored.packages.len(), 3);
        assert_eq!(stored.packages[0].model_id, "0");
    }

    #[tokio::test]
    async fn test_record_with_nothing_buffered_is_noop() {
        let (ledger, _store, _clock) = make_ledger(3);
        let id = ledger
            .record("users", "flaky", &[Uuid::new_v4()])
            .await
            .unwrap();
        assert!(id.is_none());
        assert_eq!(ledger.archive().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_retry_success_deletes_record() {
        let (ledger, store, _clock) = make_ledger(3);
        let uuids = buffer_packages(&store, 2).await;
        let id = ledger.record("users", "flaky", &uuids).await.unwrap().unwrap();

        let subscriber = FlakySubscriber::new(false);
        let shipment = ledger.archive().get(id).await.unwrap().unwrap();
        let outcome = ledger.retry(&shipment, &subscriber).await.unwrap();

        assert_eq!(outcome, RetryOutcome::Reshipped);
        assert_eq!(subscriber.calls(), 1);
        assert_eq!(ledger.archive().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_retry_failure_keeps_record_and_consumes_budget() {
        let (ledger, store, clock) = make_ledger(3);
        let uuids = buffer_packages(&store, 2).await;
        let id = ledger.record("users", "flaky", &uuids).await.unwrap().unwrap();

        let subscriber = FlakySubscriber::new(true);
        let shipment = ledger.archive().get(id).await.unwrap().unwrap();
        let outcome = ledger.retry(&shipment, &subscriber).await.unwrap();

        assert_eq!(outcome, RetryOutcome::Failed);
        let stored = ledger.archive().get(id).await.unwrap().unwrap();
        assert_eq!(stored.retries, 1);
        assert_eq!(stored.last_retried_at, Some(clock.now()));
    }

    #[tokio::test]
    async fn test_retry_at_cap_never_contacts_subscriber() {
        let (ledger, store, _clock) = make_ledger(3);
        let uuids = buffer_packages(&store, 1).await;
        let id = ledger.record("users", "flaky", &uuids).await.unwrap().unwrap();
        ledger
            .archive()
            .mark_retried(id, 2, contracts::Timestamp(1))
            .await
            .unwrap();

        let subscriber = FlakySubscriber::new(false);
        let shipment = ledger.archive().get(id).await.unwrap().unwrap();
        let outcome = ledger.retry(&shipment, &subscriber).await.unwrap();

        assert_eq!(outcome, RetryOutcome::CapReached);
        assert_eq!(subscriber.calls(), 0);
        // Record stays for inspection, marked at the cap
        let stored = ledger.archive().get(id).await.unwrap().unwrap();
        assert_eq!(stored.retries, 3);
    }

    #[tokio::test]
    async fn test_due_respects_cooldown_and_cap() {
        let (ledger, store, clock) = make_ledger(3);
        let uuids = buffer_packages(&store, 1).await;
        let id = ledger.record("users", "flaky", &uuids).await.unwrap().unwrap();

        // Fresh record is due immediately
        assert_eq!(ledger.due_for_retry(0, RETRY_PAGE_SIZE).await.unwrap().len(), 1);

        let subscriber = FlakySubscriber::new(true);
        let shipment = ledger.archive().get(id).await.unwrap().unwrap();
        ledger.retry(&shipment, &subscriber).await.unwrap();

        // Cooling down
        assert!(ledger.due_for_retry(0, RETRY_PAGE_SIZE).await.unwrap().is_empty());

        clock.advance(RETRY_COOLDOWN);
        assert_eq!(ledger.due_for_retry(0, RETRY_PAGE_SIZE).await.unwrap().len(), 1);

        // Exhaust the budget: no longer due no matter how long we wait
        ledger
            .archive()
            .mark_retried(id, 3, clock.now())
            .await
            .unwrap();
        clock.advance(RETRY_COOLDOWN);
        assert!(ledger.due_for_retry(0, RETRY_PAGE_SIZE).await.unwrap().is_empty());
    }
}
