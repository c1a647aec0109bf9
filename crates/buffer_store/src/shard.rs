//! Shard storage - per-collection buffers behind per-shard mutexes

use std::collections::{BTreeSet, HashMap};

use contracts::PackageMode;
use uuid::Uuid;

/// Stored package fields, the equivalent of one per-uuid hash record
#[derive(Debug, Clone)]
pub(crate) struct PackageRecord {
    pub id: String,
    /// Payload packed as a JSON string
    pub payload: String,
    pub mode: PackageMode,
}

/// One collection's buffer: ordered membership, field records, length counter
#[derive(Debug, Default)]
pub(crate) struct CollectionBuffer {
    /// Members scored by insertion sequence; ascending iteration is FIFO
    pub members: BTreeSet<(u64, Uuid)>,
    /// uuid -> stored fields
    pub records: HashMap<Uuid, PackageRecord>,
    /// Shipment-length counter. Incremented before records land (the push
    /// batch closes that window), decremented by flush.
    pub length: i64,
}

impl CollectionBuffer {
    /// First `limit` member uuids in storage order
    pub fn first_uuids(&self, limit: usize) -> Vec<Uuid> {
        self.members
            .iter()
            .take(limit)
            .map(|(_, uuid)| *uuid)
            .collect()
    }
}

/// A shard owns every collection that hashes onto it
#[derive(Debug, Default)]
pub(crate) struct Shard {
    pub collections: HashMap<String, CollectionBuffer>,
}
