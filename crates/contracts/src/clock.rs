//! Clock abstraction
//!
//! Manifest readiness, throttle windows, lock leases and retry cooldowns all
//! read time through this trait. Production uses [`SystemClock`]; tests drive
//! a [`ManualClock`] so window and lease behavior is deterministic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Milliseconds since the UNIX epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub fn from_millis(ms: u64) -> Self {
        Timestamp(ms)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Start of the minute this timestamp falls in
    pub fn minute_start(&self) -> Timestamp {
        Timestamp(self.0 - self.0 % 60_000)
    }

    pub fn saturating_sub(&self, other: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(other.0))
    }
}

impl std::ops::Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Self::Output {
        Timestamp(self.0.saturating_add(rhs.as_millis() as u64))
    }
}

/// Time source trait
pub trait Clock: Send + Sync {
    /// Current time
    fn now(&self) -> Timestamp;

    /// Elapsed time since a previous timestamp
    fn elapsed(&self, since: Timestamp) -> Duration {
        self.now().saturating_sub(since)
    }

    /// Whether `duration` has passed since `since`
    fn has_elapsed(&self, since: Timestamp, duration: Duration) -> bool {
        self.elapsed(since) >= duration
    }
}

/// Real system time, monotonic after process start
pub struct SystemClock {
    start: Instant,
    start_millis: u64,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        let start_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self {
            start: Instant::now(),
            start_millis,
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.start_millis + self.start.elapsed().as_millis() as u64)
    }
}

/// Virtual clock for tests; time advances only when told to
#[derive(Clone, Default)]
pub struct ManualClock {
    time_ms: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            time_ms: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.time_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.time_ms.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.time_ms.load(Ordering::SeqCst))
    }
}
