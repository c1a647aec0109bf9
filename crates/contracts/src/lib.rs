//! # Contracts
//!
//! Frozen interface contracts shared by every shipper crate: inter-module
//! data structures, traits and the unified error type. Business crates may
//! only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! All time-dependent behavior (manifest readiness, throttle windows, lock
//! leases, retry cooldowns) goes through the [`Clock`] trait so it can be
//! driven deterministically in tests.

mod clock;
mod config;
mod error;
mod package;
mod subscriber;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use config::ShipperConfig;
pub use error::*;
pub use package::{Package, PackageMode, Payload};
pub use subscriber::DataSubscriber;
