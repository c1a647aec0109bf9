//! Static shipper configuration, fixed for the process lifetime

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Core shipment tuning knobs plus the configured subscriber names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipperConfig {
    /// Maximum packages per shipment; reaching it forces immediate readiness
    pub max_shipment_size: usize,
    /// How long a non-empty buffer may wait before forced dispatch
    pub max_wait: Duration,
    /// Maximum dispatch attempts per collection per minute
    pub max_shipments_per_minute: u32,
    /// Maximum automatic retries for a failed shipment
    pub max_retries: u32,
    /// Subscriber names, resolved at startup; unknown names fail fast
    pub subscribers: Vec<String>,
}

impl Default for ShipperConfig {
    fn default() -> Self {
        Self {
            max_shipment_size: 10,
            max_wait: Duration::from_secs(5 * 60),
            max_shipments_per_minute: 10,
            max_retries: 3,
            subscribers: vec!["log".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ShipperConfig::default();
        assert_eq!(config.max_shipment_size, 10);
        assert_eq!(config.max_wait, Duration::from_secs(300));
        assert_eq!(config.max_shipments_per_minute, 10);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.subscribers, vec!["log".to_string()]);
    }
}
