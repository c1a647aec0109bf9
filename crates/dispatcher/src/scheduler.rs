//! Scheduler - periodic ship and retry sweeps

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, instrument};

use crate::coordinator::DispatchCoordinator;

/// Sweep cadence
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// How often ready collections are dispatched
    pub ship_interval: Duration,
    /// How often archived failed shipments are replayed
    pub retry_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            ship_interval: Duration::from_secs(60),
            retry_interval: Duration::from_secs(300),
        }
    }
}

/// Drives the coordinator on a fixed cadence
///
/// A sweep that errors is logged and dropped; the next tick starts clean.
/// Collections are dispatched concurrently, one task per collection, since
/// each pipeline is already serialized by its own active lease.
pub struct Scheduler {
    coordinator: Arc<DispatchCoordinator>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(coordinator: Arc<DispatchCoordinator>, config: SchedulerConfig) -> Self {
        Self {
            coordinator,
            config,
        }
    }

    /// Spawn the scheduler loop as a background task
    ///
    /// Runs until the returned handle is aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(self) {
        info!(
            ship_interval = ?self.config.ship_interval,
            retry_interval = ?self.config.retry_interval,
            "scheduler started"
        );

        let mut ship = interval(self.config.ship_interval);
        ship.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut retry = interval(self.config.retry_interval);
        retry.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ship.tick() => self.ship_tick().await,
                _ = retry.tick() => self.retry_tick().await,
            }
        }
    }

    /// One ship sweep: dispatch every ready collection
    #[instrument(name = "ship_tick", skip(self))]
    pub async fn ship_tick(&self) {
        let pending = self.coordinator.store().pending_collections();
        if pending.is_empty() {
            return;
        }

        let mut tasks = Vec::with_capacity(pending.len());
        for collection in pending {
            let coordinator = self.coordinator.clone();
            tasks.push(tokio::spawn(async move {
                if let Err(err) = coordinator.dispatch_collection(&collection).await {
                    error!(collection = %collection, error = %err, "dispatch failed");
                }
            }));
        }
        for task in tasks {
            // A panicked dispatch task only loses its own collection's turn
            let _ = task.await;
        }
    }

    /// One retry sweep over the failure ledger
    #[instrument(name = "retry_tick", skip(self))]
    pub async fn retry_tick(&self) {
        if let Err(err) = self.coordinator.retry_sweep().await {
            error!(error = %err, "retry sweep failed");
        }
    }
}
