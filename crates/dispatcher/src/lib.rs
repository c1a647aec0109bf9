//! # Dispatcher
//!
//! Shipment dispatch pipeline.
//!
//! Responsibilities:
//! - drain ready collections from the buffer manifest
//! - fan one shipment out to every registered subscriber
//! - isolate subscriber failures into the failure ledger
//! - enforce the active-pipeline lock and per-minute throttle
//! - drive the periodic ship and retry sweeps

pub mod coordinator;
pub mod registry;
pub mod scheduler;
pub mod subscribers;

pub use contracts::DataSubscriber;
pub use coordinator::{DispatchCoordinator, DispatchOutcome};
pub use registry::SubscriberRegistry;
pub use scheduler::{Scheduler, SchedulerConfig};
pub use subscribers::LogSubscriber;
