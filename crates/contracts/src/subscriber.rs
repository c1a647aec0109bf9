//! DataSubscriber trait - downstream ingestion interface
//!
//! A subscriber is an opaque `ship(packages)` capability for one downstream
//! system. Delivery is at-least-once: a crashed pipeline redispatches after
//! its lease expires, so implementations must ingest idempotently.

use async_trait::async_trait;

use crate::{Package, ShipperError};

/// Downstream shipment target
///
/// All subscriber implementations must implement this trait. Registries hold
/// subscribers as trait objects, resolved by configured name at startup.
#[async_trait]
pub trait DataSubscriber: Send + Sync {
    /// Subscriber name (used for resolution, logging and the failure ledger)
    fn name(&self) -> &str;

    /// Ingest one shipment batch, in buffer order
    ///
    /// # Errors
    /// Any error is recorded as a failed shipment and retried later; it never
    /// aborts the dispatch pipeline.
    async fn ship(&self, packages: &[Package]) -> Result<(), ShipperError>;
}
