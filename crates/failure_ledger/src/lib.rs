//! # Failure Ledger
//!
//! Durable record of shipments a subscriber could not ingest, with bounded
//! automatic retry. A failed shipment owns payload snapshots taken before
//! the buffer was cleared, so replay needs nothing from the buffer store.
//!
//! The archive is a trait seam: any transactional store with parent-child
//! cascade delete can back it. [`MemoryArchive`] ships for tests and
//! single-process deployments.

mod archive;
mod ledger;
mod model;

pub use archive::{ArchiveStore, MemoryArchive};
pub use ledger::{FailureLedger, RetryOutcome, RETRY_COOLDOWN, RETRY_PAGE_SIZE};
pub use model::{FailedPackage, FailedShipment};
