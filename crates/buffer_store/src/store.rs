//! BufferStore - the buffering engine
//!
//! A sharded in-process key-value store shaped after the original wire
//! layout: per collection an insertion-ordered uuid set, one field record
//! per package and a shipment-length counter, plus the global readiness
//! manifest. Shard guards are held only for the duration of one batch and
//! never across an await, which gives every multi-step mutation atomic
//! visibility.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{Clock, Package, ShipperError, Timestamp};
use metrics::gauge;
use parking_lot::Mutex;
use tracing::{debug, instrument, trace};
use uuid::Uuid;

use crate::locks::{LeaseLocks, BUFFER_LOCK_TTL, LOCK_WAIT};
use crate::manifest::Manifest;
use crate::shard::{CollectionBuffer, PackageRecord, Shard};

const SHARD_COUNT: usize = 16;

/// Key-value-store-backed package buffer with readiness manifest
pub struct BufferStore {
    shards: Vec<Mutex<Shard>>,
    manifest: Manifest,
    locks: LeaseLocks,
    clock: Arc<dyn Clock>,
    /// Maximum packages per shipment
    capacity: usize,
    /// Wait before a non-full buffer is forced to dispatch
    max_wait: Duration,
    /// Monotonic insertion score; ascending order is FIFO
    seq: AtomicU64,
}

impl BufferStore {
    pub fn new(capacity: usize, max_wait: Duration, clock: Arc<dyn Clock>) -> Self {
        let shards = (0..SHARD_COUNT).map(|_| Mutex::new(Shard::default())).collect();
        Self {
            shards,
            manifest: Manifest::new(),
            locks: LeaseLocks::new(clock.clone()),
            clock,
            capacity,
            max_wait,
            seq: AtomicU64::new(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The lock table shared with the dispatch coordinator
    pub fn locks(&self) -> &LeaseLocks {
        &self.locks
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Buffer packages for a collection
    ///
    /// Increments the length counter under the collection's buffer lock
    /// (serialized against a concurrent flush), schedules manifest readiness
    /// when warranted, then lands membership and field records in one batch.
    ///
    /// # Errors
    /// `CoordinationTimeout` when the buffer lock is not acquired in time.
    #[instrument(name = "buffer_push", skip(self, packages), fields(collection = %collection, count = packages.len()))]
    pub async fn push(&self, collection: &str, packages: &[Package]) -> Result<(), ShipperError> {
        if packages.is_empty() {
            return Ok(());
        }

        let count = packages.len() as i64;
        let guard = self
            .locks
            .acquire(&buffer_lock_key(collection), BUFFER_LOCK_TTL, LOCK_WAIT)
            .await?;
        let (pre, post) = {
            let mut shard = self.shard_for(collection).lock();
            let buffer = shard.collections.entry(collection.to_string()).or_default();
            let pre = buffer.length;
            buffer.length += count;
            (pre, buffer.length)
        };
        self.locks.release(guard);

        let now = self.clock.now();
        if pre == 0 && (post as usize) < self.capacity {
            // Buffer just became non-empty: ship after the wait window
            self.manifest.schedule(collection, now + self.max_wait);
        } else if post as usize >= self.capacity {
            // Capacity reached: ship now
            self.manifest.schedule(collection, now);
        }

        {
            let mut shard = self.shard_for(collection).lock();
            let buffer = shard.collections.entry(collection.to_string()).or_default();
            for package in packages {
                let score = self.seq.fetch_add(1, Ordering::Relaxed);
                buffer.members.insert((score, package.uuid));
                buffer.records.insert(
                    package.uuid,
                    PackageRecord {
                        id: package.id.clone(),
                        payload: package.pack()?,
                        mode: package.mode,
                    },
                );
            }
            gauge!("shipper_buffer_depth", "collection" => collection.to_string())
                .set(buffer.members.len() as f64);
        }

        debug!(collection = %collection, pushed = count, depth = post, "packages buffered");
        Ok(())
    }

    /// Reconstruct packages for the given uuids
    ///
    /// One atomic read of all field records plus the current length. Uuids
    /// whose records are already cleared are silently dropped. A buffer left
    /// partially drained by this read (between 1 and capacity-1 remaining)
    /// has its readiness pushed back to debounce an eager follow-up flush.
    pub fn packages_by_uuids(
        &self,
        collection: &str,
        uuids: &[Uuid],
    ) -> Result<Vec<Package>, ShipperError> {
        let (records, length) = {
            let shard = self.shard_for(collection).lock();
            match shard.collections.get(collection) {
                Some(buffer) => {
                    let found: Vec<(Uuid, PackageRecord)> = uuids
                        .iter()
                        .filter_map(|uuid| {
                            buffer.records.get(uuid).map(|rec| (*uuid, rec.clone()))
                        })
                        .collect();
                    (found, buffer.length)
                }
                None => return Ok(Vec::new()),
            }
        };

        let remaining = length - uuids.len() as i64;
        if remaining >= 1 && (remaining as usize) < self.capacity {
            trace!(collection = %collection, remaining, "rescheduling partially drained buffer");
            self.manifest
                .schedule(collection, self.clock.now() + self.max_wait);
        }

        records
            .into_iter()
            .map(|(uuid, rec)| {
                Ok(Package::with_uuid(
                    rec.id,
                    uuid,
                    Package::unpack(&rec.payload)?,
                    collection,
                    rec.mode,
                ))
            })
            .collect()
    }

    /// Up to `capacity` member uuids in storage order
    pub fn package_uuids_for_shipment(&self, collection: &str) -> Vec<Uuid> {
        let shard = self.shard_for(collection).lock();
        shard
            .collections
            .get(collection)
            .map(|buffer| buffer.first_uuids(self.capacity))
            .unwrap_or_default()
    }

    /// All packages belonging to the next shipment of a collection
    pub fn packages_for_shipment(&self, collection: &str) -> Result<Vec<Package>, ShipperError> {
        let uuids = self.package_uuids_for_shipment(collection);
        self.packages_by_uuids(collection, &uuids)
    }

    /// Clear the first `length` packages of a collection
    ///
    /// Runs under the collection's buffer lock. Deletes records, removes
    /// membership, decrements the counter by the number actually removed,
    /// and garbage-collects the whole buffer (and its manifest entry) once
    /// it is empty, so idle collections cost nothing.
    ///
    /// Returns `true` when the removed count equals capacity exactly: the
    /// buffer was full again at flush time and should dispatch again
    /// immediately.
    #[instrument(name = "buffer_flush", skip(self), fields(collection = %collection, length))]
    pub async fn flush(&self, collection: &str, length: usize) -> Result<bool, ShipperError> {
        let guard = self
            .locks
            .acquire(&buffer_lock_key(collection), BUFFER_LOCK_TTL, LOCK_WAIT)
            .await?;

        let (removed, remaining) = {
            let mut shard = self.shard_for(collection).lock();
            match shard.collections.get_mut(collection) {
                Some(buffer) => {
                    let targets: Vec<(u64, Uuid)> =
                        buffer.members.iter().take(length).copied().collect();
                    for (score, uuid) in &targets {
                        buffer.records.remove(uuid);
                        buffer.members.remove(&(*score, *uuid));
                    }
                    buffer.length -= targets.len() as i64;
                    let remaining = buffer.length;
                    if remaining <= 0 {
                        shard.collections.remove(collection);
                    }
                    (targets.len(), remaining)
                }
                None => (0, 0),
            }
        };

        if remaining <= 0 {
            self.manifest.remove(collection);
        }
        self.locks.release(guard);

        gauge!("shipper_buffer_depth", "collection" => collection.to_string())
            .set(remaining.max(0) as f64);
        debug!(collection = %collection, removed, remaining, "shipment cleared");

        Ok(removed == self.capacity)
    }

    /// Collections whose readiness timestamp has passed
    pub fn pending_collections(&self) -> Vec<String> {
        self.manifest.pending(self.clock.now())
    }

    /// Current buffer membership count for a collection
    pub fn shipment_length(&self, collection: &str) -> usize {
        let shard = self.shard_for(collection).lock();
        shard
            .collections
            .get(collection)
            .map(|buffer| buffer.members.len())
            .unwrap_or(0)
    }

    /// Whether any keys exist for a collection (membership or counter)
    pub fn collection_exists(&self, collection: &str) -> bool {
        let shard = self.shard_for(collection).lock();
        shard.collections.contains_key(collection)
    }

    /// Readiness time recorded for a collection, if scheduled
    pub fn scheduled_at(&self, collection: &str) -> Option<Timestamp> {
        self.manifest.scheduled_at(collection)
    }

    fn shard_for(&self, collection: &str) -> &Mutex<Shard> {
        let mut hasher = DefaultHasher::new();
        collection.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % SHARD_COUNT]
    }
}

fn buffer_lock_key(collection: &str) -> String {
    format!("{collection}-buffer-lock")
}
