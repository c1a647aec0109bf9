//! Config file parsing
//!
//! Supports TOML (primary) and JSON formats.

use std::time::Duration;

use contracts::{ShipperConfig, ShipperError};
use serde::{Deserialize, Serialize};

/// Config file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Infer format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// On-disk configuration shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipperFileConfig {
    /// Subscriber names to resolve at startup
    pub subscribers: Vec<String>,

    #[serde(default)]
    pub shipments: ShipmentsSection,

    #[serde(default)]
    pub scheduler: SchedulerSection,

    #[serde(default)]
    pub observability: ObservabilitySection,
}

/// `[shipments]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipmentsSection {
    /// Packages per shipment before immediate readiness is forced
    pub max_size: usize,
    /// Minutes a non-empty buffer may wait before forced dispatch
    pub max_wait_minutes: u64,
    /// Dispatch attempts allowed per collection per minute
    pub max_shipments_per_minute: u32,
    /// Automatic retries for a failed shipment
    pub max_retries: u32,
}

impl Default for ShipmentsSection {
    fn default() -> Self {
        Self {
            max_size: 10,
            max_wait_minutes: 5,
            max_shipments_per_minute: 10,
            max_retries: 3,
        }
    }
}

/// `[scheduler]` section - external trigger intervals
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    /// Seconds between pending-collection sweeps
    pub ship_interval_secs: u64,
    /// Seconds between failure-ledger retry sweeps
    pub retry_interval_secs: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            ship_interval_secs: 60,
            retry_interval_secs: 300,
        }
    }
}

/// `[observability]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilitySection {
    /// Log format name: json / pretty / compact
    pub log_format: String,
    /// Prometheus listener port (absent = disabled)
    pub metrics_port: Option<u16>,
}

impl Default for ObservabilitySection {
    fn default() -> Self {
        Self {
            log_format: "json".to_string(),
            metrics_port: None,
        }
    }
}

impl ShipperFileConfig {
    /// Collapse the file shape into the core config contract
    pub fn to_shipper_config(&self) -> ShipperConfig {
        ShipperConfig {
            max_shipment_size: self.shipments.max_size,
            max_wait: Duration::from_secs(self.shipments.max_wait_minutes * 60),
            max_shipments_per_minute: self.shipments.max_shipments_per_minute,
            max_retries: self.shipments.max_retries,
            subscribers: self.subscribers.clone(),
        }
    }
}

/// Parse TOML content
pub fn parse_toml(content: &str) -> Result<ShipperFileConfig, ShipperError> {
    toml::from_str(content).map_err(|e| ShipperError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON content
pub fn parse_json(content: &str) -> Result<ShipperFileConfig, ShipperError> {
    serde_json::from_str(content).map_err(|e| ShipperError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse content in the given format
pub fn parse(content: &str, format: ConfigFormat) -> Result<ShipperFileConfig, ShipperError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
subscribers = ["log"]

[shipments]
max_size = 25
max_wait_minutes = 2
"#;
        let config = parse_toml(content).unwrap();
        assert_eq!(config.subscribers, vec!["log"]);
        assert_eq!(config.shipments.max_size, 25);
        assert_eq!(config.shipments.max_wait_minutes, 2);
        // Unset fields take defaults
        assert_eq!(config.shipments.max_shipments_per_minute, 10);
        assert_eq!(config.shipments.max_retries, 3);
        assert_eq!(config.scheduler.ship_interval_secs, 60);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "subscribers": ["log"],
            "shipments": { "max_size": 5, "max_wait_minutes": 1, "max_shipments_per_minute": 1, "max_retries": 2 }
        }"#;
        let config = parse_json(content).unwrap();
        assert_eq!(config.shipments.max_size, 5);
        assert_eq!(config.shipments.max_shipments_per_minute, 1);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let result = parse_toml("invalid toml [[[");
        assert!(matches!(
            result.unwrap_err(),
            ShipperError::ConfigParse { .. }
        ));
    }

    #[test]
    fn test_to_shipper_config() {
        let config = parse_toml("subscribers = [\"log\"]").unwrap();
        let core = config.to_shipper_config();
        assert_eq!(core.max_shipment_size, 10);
        assert_eq!(core.max_wait, std::time::Duration::from_secs(300));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("JSON"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
