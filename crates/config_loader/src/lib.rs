//! # Config Loader
//!
//! Configuration loading and parsing.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Produce a [`ShipperFileConfig`] (and the core `ShipperConfig` from it)
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("data-shipper.toml")).unwrap();
//! println!("subscribers: {:?}", config.subscribers);
//! ```

mod parser;
mod validator;

pub use parser::{
    ConfigFormat, ObservabilitySection, SchedulerSection, ShipmentsSection, ShipperFileConfig,
};

use std::path::Path;

use contracts::ShipperError;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file path
    ///
    /// Detects the format from the file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<ShipperFileConfig, ShipperError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from a string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<ShipperFileConfig, ShipperError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Serialize a config to a TOML string
    pub fn to_toml(config: &ShipperFileConfig) -> Result<String, ShipperError> {
        toml::to_string_pretty(config)
            .map_err(|e| ShipperError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize a config to a JSON string
    pub fn to_json(config: &ShipperFileConfig) -> Result<String, ShipperError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ShipperError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    fn detect_format(path: &Path) -> Result<ConfigFormat, ShipperError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ShipperError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext)
            .ok_or_else(|| ShipperError::config_parse(format!("unsupported config format: .{ext}")))
    }

    fn read_file(path: &Path) -> Result<String, ShipperError> {
        Ok(std::fs::read_to_string(path)?)
    }
}
