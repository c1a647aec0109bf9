//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    subscriber_count: usize,
    max_shipment_size: usize,
    max_wait_minutes: u64,
    max_shipments_per_minute: u32,
    max_retries: u32,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    subscriber_count: config.subscribers.len(),
                    max_shipment_size: config.shipments.max_size,
                    max_wait_minutes: config.shipments.max_wait_minutes,
                    max_shipments_per_minute: config.shipments.max_shipments_per_minute,
                    max_retries: config.shipments.max_retries,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &config_loader::ShipperFileConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.shipments.max_shipments_per_minute == 1 {
        warnings.push(
            "shipments.max_shipments_per_minute is 1 - a full buffer cannot requeue within \
             its window"
                .to_string(),
        );
    }

    if config.shipments.max_wait_minutes > 60 {
        warnings.push(format!(
            "shipments.max_wait_minutes is {} - changes may sit unbuffered for over an hour",
            config.shipments.max_wait_minutes
        ));
    }

    if config.observability.metrics_port.is_none() {
        warnings.push("observability.metrics_port is unset - Prometheus export disabled".to_string());
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(path: std::path::PathBuf) -> ValidateArgs {
        ValidateArgs {
            config: path,
            json: false,
        }
    }

    #[test]
    fn test_validate_missing_file() {
        let result = validate_config(&args("no-such-file.toml".into()));
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn test_validate_good_config() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "subscribers = [\"log\"]").unwrap();

        let result = validate_config(&args(file.path().to_path_buf()));
        assert!(result.valid);
        assert_eq!(result.summary.unwrap().subscriber_count, 1);
    }

    #[test]
    fn test_validate_bad_config() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "subscribers = []").unwrap();

        let result = validate_config(&args(file.path().to_path_buf()));
        assert!(!result.valid);
    }
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Subscribers: {}", summary.subscriber_count);
            println!("  Max shipment size: {}", summary.max_shipment_size);
            println!("  Max wait: {} min", summary.max_wait_minutes);
            println!(
                "  Max shipments per minute: {}",
                summary.max_shipments_per_minute
            );
            println!("  Max retries: {}", summary.max_retries);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
