//! DispatchCoordinator - the per-collection shipment pipeline
//!
//! One pipeline run per collection at a time, guarded by the active lease.
//! Inside the lease the pipeline loops: admission check, read one shipment,
//! fan out to every subscriber, clear the buffer, and go again while the
//! buffer keeps refilling to capacity.

use std::sync::Arc;

use buffer_store::{BufferStore, ACTIVE_PIPELINE_TTL};
use contracts::ShipperError;
use failure_ledger::FailureLedger;
use metrics::counter;
use throttle::{Admission, ThrottleGate};
use tracing::{debug, info, instrument, warn};

use crate::registry::SubscriberRegistry;

/// Result of one pipeline run for a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Pipeline ran to completion; total packages cleared across all rounds
    Shipped { packages: usize },
    /// Another pipeline holds this collection's active lease
    PipelineActive,
    /// Denied by the throttle; the active lease is left to expire so it
    /// doubles as the cooldown
    Throttled { packages: usize },
}

/// Drives shipments from the buffer to the registered subscribers
pub struct DispatchCoordinator {
    store: Arc<BufferStore>,
    gate: Arc<ThrottleGate>,
    registry: Arc<SubscriberRegistry>,
    ledger: Arc<FailureLedger>,
}

impl DispatchCoordinator {
    pub fn new(
        store: Arc<BufferStore>,
        gate: Arc<ThrottleGate>,
        registry: Arc<SubscriberRegistry>,
        ledger: Arc<FailureLedger>,
    ) -> Self {
        Self {
            store,
            gate,
            registry,
            ledger,
        }
    }

    pub fn store(&self) -> &Arc<BufferStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    pub fn ledger(&self) -> &Arc<FailureLedger> {
        &self.ledger
    }

    /// Run the dispatch pipeline for one collection
    ///
    /// A subscriber failure never aborts the run: the shipment is archived
    /// for that subscriber and the fan-out continues, so one slow or broken
    /// downstream cannot starve the others.
    ///
    /// # Errors
    /// Coordination and archive errors; the active lease is released first.
    #[instrument(name = "dispatch_collection", skip(self), fields(collection = %collection))]
    pub async fn dispatch_collection(
        &self,
        collection: &str,
    ) -> Result<DispatchOutcome, ShipperError> {
        let key = active_pipeline_key(collection);
        let Some(guard) = self.store.locks().try_acquire(&key, ACTIVE_PIPELINE_TTL) else {
            debug!(collection = %collection, "pipeline already active, skipping");
            return Ok(DispatchOutcome::PipelineActive);
        };

        match self.run_pipeline(collection).await {
            // Keep the lease: its remaining TTL is the throttle cooldown
            Ok(DispatchOutcome::Throttled { packages }) => {
                counter!("shipper_dispatch_throttled", "collection" => collection.to_string())
                    .increment(1);
                let _cooldown = guard;
                Ok(DispatchOutcome::Throttled { packages })
            }
            Ok(outcome) => {
                self.store.locks().release(guard);
                Ok(outcome)
            }
            Err(error) => {
                self.store.locks().release(guard);
                Err(error)
            }
        }
    }

    async fn run_pipeline(&self, collection: &str) -> Result<DispatchOutcome, ShipperError> {
        let mut total = 0usize;
        loop {
            let admission = self.gate.check(collection);
            if !admission.is_allowed() {
                debug!(collection = %collection, shipped = total, "dispatch throttled");
                return Ok(DispatchOutcome::Throttled { packages: total });
            }

            let uuids = self.store.package_uuids_for_shipment(collection);
            if uuids.is_empty() {
                return Ok(DispatchOutcome::Shipped { packages: total });
            }
            let packages = self.store.packages_by_uuids(collection, &uuids)?;

            for subscriber in self.registry.all() {
                if let Err(error) = subscriber.ship(&packages).await {
                    warn!(
                        collection = %collection,
                        subscriber = %subscriber.name(),
                        %error,
                        "subscriber rejected shipment"
                    );
                    self.ledger
                        .record(collection, subscriber.name(), &uuids)
                        .await?;
                }
            }

            let full = self.store.flush(collection, uuids.len()).await?;
            total += uuids.len();
            counter!("shipper_packages_shipped", "collection" => collection.to_string())
                .increment(uuids.len() as u64);

            // A full shipment means the buffer may already hold the next
            // one; go again unless this window's budget is spent
            if full && admission != Admission::AdmittedLimitReached {
                debug!(collection = %collection, shipped = total, "buffer full again, requeueing");
                continue;
            }

            info!(collection = %collection, packages = total, "dispatch complete");
            return Ok(DispatchOutcome::Shipped { packages: total });
        }
    }

    /// Dispatch every collection whose readiness time has passed
    pub async fn dispatch_pending(&self) -> Result<usize, ShipperError> {
        let pending = self.store.pending_collections();
        let count = pending.len();
        for collection in pending {
            self.dispatch_collection(&collection).await?;
        }
        Ok(count)
    }

    /// Replay archived failed shipments whose cooldown has passed
    ///
    /// Pages through the due set; shipments whose subscriber is no longer
    /// configured are skipped in place and picked up again once it returns.
    #[instrument(name = "retry_sweep", skip(self))]
    pub async fn retry_sweep(&self) -> Result<usize, ShipperError> {
        let mut attempted = 0usize;
        let mut skipped = 0usize;
        loop {
            let page = self
                .ledger
                .due_for_retry(skipped, failure_ledger::RETRY_PAGE_SIZE)
                .await?;
            if page.is_empty() {
                break;
            }
            for shipment in page {
                match self.registry.get(&shipment.subscriber) {
                    Some(subscriber) => {
                        self.ledger.retry(&shipment, subscriber.as_ref()).await?;
                        attempted += 1;
                    }
                    None => {
                        warn!(
                            shipment = %shipment.id,
                            subscriber = %shipment.subscriber,
                            "subscriber not configured, leaving shipment archived"
                        );
                        skipped += 1;
                    }
                }
            }
        }
        if attempted > 0 {
            info!(attempted, skipped, "retry sweep complete");
        }
        Ok(attempted)
    }
}

fn active_pipeline_key(collection: &str) -> String {
    format!("{collection}-active")
}
