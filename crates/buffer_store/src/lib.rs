//! # Buffer Store
//!
//! Key-value-store-backed buffering of packages, grouped per collection.
//!
//! Responsibilities:
//! - Per-collection ordered membership (insertion-scored uuid set), package
//!   field records and a shipment-length counter, sharded by collection name
//! - A global readiness manifest deciding when a collection ships
//! - Lease locks (TTL) serializing buffer mutation and flush per collection
//!
//! All multi-step mutations execute under one shard guard, so a push or
//! flush is never partially visible to concurrent readers.

mod locks;
mod manifest;
mod shard;
mod store;

pub use locks::{LeaseGuard, LeaseLocks, ACTIVE_PIPELINE_TTL, BUFFER_LOCK_TTL, LOCK_WAIT};
pub use manifest::Manifest;
pub use store::BufferStore;
