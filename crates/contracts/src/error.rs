//! Layered error definitions
//!
//! Categorized by source: validation / config / coordination / subscriber /
//! archive.

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ShipperError {
    // ===== Validation Errors =====
    /// Malformed producer input, rejected synchronously and never buffered
    #[error("validation error: {message}")]
    Validation { message: String },

    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// No resolver exists for a configured subscriber name
    #[error("unknown subscriber: {name}")]
    UnknownSubscriber { name: String },

    // ===== Coordination Errors =====
    /// Lock not acquired within the bounded wait
    #[error("lock '{key}' not acquired within {waited_ms}ms")]
    CoordinationTimeout { key: String, waited_ms: u64 },

    // ===== Subscriber Errors =====
    /// A subscriber could not ingest a shipment batch
    #[error("subscriber '{subscriber}' ingestion error: {message}")]
    SubscriberIngestion { subscriber: String, message: String },

    // ===== Archive Errors =====
    /// Failure-ledger archive store error
    #[error("archive error: {message}")]
    Archive { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ShipperError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an unknown subscriber error
    pub fn unknown_subscriber(name: impl Into<String>) -> Self {
        Self::UnknownSubscriber { name: name.into() }
    }

    /// Create a coordination timeout error
    pub fn coordination_timeout(key: impl Into<String>, waited_ms: u64) -> Self {
        Self::CoordinationTimeout {
            key: key.into(),
            waited_ms,
        }
    }

    /// Create a subscriber ingestion error
    pub fn subscriber_ingestion(subscriber: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SubscriberIngestion {
            subscriber: subscriber.into(),
            message: message.into(),
        }
    }

    /// Create an archive error
    pub fn archive(message: impl Into<String>) -> Self {
        Self::Archive {
            message: message.into(),
        }
    }

    /// Create an uncategorized error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}
