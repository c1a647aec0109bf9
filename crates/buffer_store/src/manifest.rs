//! Readiness manifest - which collections ship, and when
//!
//! One entry per collection (map semantics, last writer wins). A collection
//! is scheduled at `now + max_wait` when its buffer first becomes non-empty
//! and at `now` once it crosses capacity.

use std::collections::HashMap;

use contracts::Timestamp;
use parking_lot::Mutex;

/// Sorted index of collection name -> readiness timestamp
#[derive(Default)]
pub struct Manifest {
    inner: Mutex<HashMap<String, Timestamp>>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or overwrite) a collection's readiness time
    pub fn schedule(&self, collection: &str, ready_at: Timestamp) {
        self.inner.lock().insert(collection.to_string(), ready_at);
    }

    /// Drop a collection's entry, if any
    pub fn remove(&self, collection: &str) {
        self.inner.lock().remove(collection);
    }

    /// The readiness time currently recorded for a collection
    pub fn scheduled_at(&self, collection: &str) -> Option<Timestamp> {
        self.inner.lock().get(collection).copied()
    }

    /// Collections ready at or before `now`, soonest first
    pub fn pending(&self, now: Timestamp) -> Vec<String> {
        let table = self.inner.lock();
        let mut due: Vec<(&String, Timestamp)> = table
            .iter()
            .filter(|(_, ready_at)| **ready_at <= now)
            .map(|(name, ready_at)| (name, *ready_at))
            .collect();
        due.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        due.into_iter().map(|(name, _)| name.clone()).collect()
    }

    /// Number of scheduled collections
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
