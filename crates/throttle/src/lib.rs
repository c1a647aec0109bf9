//! # Throttle
//!
//! Per-collection dispatch admission control over a fixed one-minute window.
//!
//! State per collection is one last-activity timestamp (stamped at window
//! start) and a counter that self-expires 60 seconds after the window
//! opened. This is a coarse fixed-window throttle, not a sliding window:
//! bursts straddling a minute boundary can briefly exceed the configured
//! rate. Known approximation, kept cheap on purpose.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use contracts::{Clock, Timestamp};
use parking_lot::Mutex;
use tracing::{debug, trace};

const WINDOW: Duration = Duration::from_secs(60);

/// Outcome of one admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Dispatch may proceed
    Admitted,
    /// Dispatch may proceed, but this attempt hit the per-window maximum:
    /// the caller must not requeue within this window even on a full buffer
    AdmittedLimitReached,
    /// Over the per-window maximum; skip silently
    Denied,
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Admission::Denied)
    }
}

#[derive(Debug)]
struct WindowState {
    /// Stamped when the window opens; later attempts do not refresh it
    window_opened: Timestamp,
    count: u32,
}

/// Fixed-window admission gate, one window per collection
pub struct ThrottleGate {
    max_per_minute: u32,
    clock: Arc<dyn Clock>,
    state: Mutex<HashMap<String, WindowState>>,
}

impl ThrottleGate {
    pub fn new(max_per_minute: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_per_minute,
            clock,
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Check one dispatch attempt for a collection
    pub fn check(&self, collection: &str) -> Admission {
        let now = self.clock.now();
        let minute_start = now.minute_start();
        let mut table = self.state.lock();

        // Counters self-expire one window after they opened
        table.retain(|_, state| now.saturating_sub(state.window_opened) < WINDOW);

        match table.get_mut(collection) {
            // Window still active: count this attempt
            Some(state) if state.window_opened >= minute_start => {
                state.count += 1;
                if state.count > self.max_per_minute {
                    debug!(collection = %collection, count = state.count, "dispatch denied by throttle");
                    Admission::Denied
                } else if state.count == self.max_per_minute {
                    debug!(collection = %collection, "throttle limit reached for this window");
                    Admission::AdmittedLimitReached
                } else {
                    Admission::Admitted
                }
            }
            _ => {
                table.insert(
                    collection.to_string(),
                    WindowState {
                        window_opened: now,
                        count: 1,
                    },
                );
                trace!(collection = %collection, "throttle window opened");
                Admission::Admitted
            }
        }
    }

    pub fn max_per_minute(&self) -> u32 {
        self.max_per_minute
    }
}
