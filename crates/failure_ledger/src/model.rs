//! Failed shipment records

use contracts::{Package, PackageMode, Payload, Timestamp};
use uuid::Uuid;

/// Snapshot of one package that was in flight when a subscriber failed
#[derive(Debug, Clone, PartialEq)]
pub struct FailedPackage {
    /// Identifier of the originating record
    pub model_id: String,
    pub payload: Payload,
}

/// One shipment a subscriber could not ingest
///
/// Mutated only by the retry sweep; deleted (with its packages) on a
/// successful replay; left in place for operator inspection once the retry
/// budget is exhausted.
#[derive(Debug, Clone)]
pub struct FailedShipment {
    pub id: Uuid,
    pub collection: String,
    /// Name of the subscriber that failed; replay targets only this one
    pub subscriber: String,
    pub retries: u32,
    pub last_retried_at: Option<Timestamp>,
    pub packages: Vec<FailedPackage>,
}

impl FailedShipment {
    pub fn new(
        collection: impl Into<String>,
        subscriber: impl Into<String>,
        packages: Vec<FailedPackage>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            collection: collection.into(),
            subscriber: subscriber.into(),
            retries: 0,
            last_retried_at: None,
            packages,
        }
    }

    /// Rebuild shippable packages from the snapshots
    ///
    /// Replayed packages carry fresh correlation tokens and default (update)
    /// mode; they no longer live in any buffer.
    pub fn rebuild_packages(&self) -> Vec<Package> {
        self.packages
            .iter()
            .map(|snapshot| {
                Package::new(
                    snapshot.model_id.clone(),
                    snapshot.payload.clone(),
                    self.collection.clone(),
                    PackageMode::default(),
                )
            })
            .collect()
    }
}
