//! # Ingestion
//!
//! Producer-facing API. External callers hand over raw change payloads;
//! this crate validates identifiers, mints packages with correlation
//! tokens, and buffers them through the buffer store.

mod shipper;

pub use shipper::Shipper;
