//! Lease locks - exclusive locks with a TTL
//!
//! Every lock carries a lease. A holder that crashes mid-pipeline self-heals
//! once the lease expires, at the cost of one duplicate dispatch attempt.
//! The dispatch coordinator also relies on expiry as a cooldown timer: a
//! throttled pipeline deliberately leaves its lease to run out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{Clock, ShipperError, Timestamp};
use parking_lot::Mutex;
use tracing::{debug, trace};

/// Bounded wait for buffer mutation locks; exceeding it is an operational
/// error surfaced to the caller, not retried here
pub const LOCK_WAIT: Duration = Duration::from_secs(10);

/// Lease on the per-collection buffer lock held across push/flush
pub const BUFFER_LOCK_TTL: Duration = Duration::from_secs(60);

/// Lease on the per-collection active-pipeline lock; doubles as the
/// throttle cooldown when left unreleased
pub const ACTIVE_PIPELINE_TTL: Duration = Duration::from_secs(50);

const ACQUIRE_POLL: Duration = Duration::from_millis(25);

#[derive(Debug)]
struct Lease {
    token: u64,
    expires_at: Timestamp,
}

/// Proof of a held lease. Not RAII: release is explicit, and skipping it is
/// a legal way to leave the lease ticking down.
#[derive(Debug)]
#[must_use = "a lease guard must be released or deliberately left to expire"]
pub struct LeaseGuard {
    key: String,
    token: u64,
}

impl LeaseGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Table of named lease locks
pub struct LeaseLocks {
    clock: Arc<dyn Clock>,
    inner: Mutex<HashMap<String, Lease>>,
    next_token: AtomicU64,
}

impl LeaseLocks {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
        }
    }

    /// Try to take the lease without waiting
    ///
    /// Returns `None` when another holder's lease is still live. Expired
    /// leases are reaped here, on access.
    pub fn try_acquire(&self, key: &str, ttl: Duration) -> Option<LeaseGuard> {
        let now = self.clock.now();
        let mut table = self.inner.lock();

        if let Some(existing) = table.get(key) {
            if existing.expires_at > now {
                trace!(key = %key, "lease held elsewhere");
                return None;
            }
            debug!(key = %key, "reaping expired lease");
        }

        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        table.insert(
            key.to_string(),
            Lease {
                token,
                expires_at: now + ttl,
            },
        );
        Some(LeaseGuard {
            key: key.to_string(),
            token,
        })
    }

    /// Take the lease, waiting up to `max_wait` for the current holder
    ///
    /// # Errors
    /// `CoordinationTimeout` once `max_wait` passes without acquisition.
    pub async fn acquire(
        &self,
        key: &str,
        ttl: Duration,
        max_wait: Duration,
    ) -> Result<LeaseGuard, ShipperError> {
        let started = Instant::now();
        loop {
            if let Some(guard) = self.try_acquire(key, ttl) {
                return Ok(guard);
            }
            if started.elapsed() >= max_wait {
                return Err(ShipperError::coordination_timeout(
                    key,
                    started.elapsed().as_millis() as u64,
                ));
            }
            tokio::time::sleep(ACQUIRE_POLL).await;
        }
    }

    /// Release a held lease
    ///
    /// A stale guard (lease expired and re-acquired by someone else) is a
    /// no-op: the token no longer matches.
    pub fn release(&self, guard: LeaseGuard) {
        let mut table = self.inner.lock();
        if let Some(existing) = table.get(&guard.key) {
            if existing.token == guard.token {
                table.remove(&guard.key);
            }
        }
    }

    /// Whether a live lease exists for the key
    pub fn is_held(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.inner
            .lock()
            .get(key)
            .map(|lease| lease.expires_at > now)
            .unwrap_or(false)
    }
}
