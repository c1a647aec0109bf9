//! Config validation, run after parsing

use std::collections::HashSet;

use contracts::ShipperError;

use crate::parser::ShipperFileConfig;

/// Shipments beyond a few hundred packages are out of design scope
const MAX_SHIPMENT_SIZE_LIMIT: usize = 500;

/// Validate a parsed configuration
pub fn validate(config: &ShipperFileConfig) -> Result<(), ShipperError> {
    validate_subscribers(config)?;
    validate_shipments(config)?;
    validate_scheduler(config)?;
    Ok(())
}

fn validate_subscribers(config: &ShipperFileConfig) -> Result<(), ShipperError> {
    if config.subscribers.is_empty() {
        return Err(ShipperError::config_validation(
            "subscribers",
            "at least one subscriber must be configured",
        ));
    }

    let mut seen = HashSet::new();
    for name in &config.subscribers {
        if name.trim().is_empty() {
            return Err(ShipperError::config_validation(
                "subscribers",
                "subscriber name must not be empty",
            ));
        }
        if !seen.insert(name.as_str()) {
            return Err(ShipperError::config_validation(
                "subscribers",
                format!("duplicate subscriber: {name}"),
            ));
        }
    }
    Ok(())
}

fn validate_shipments(config: &ShipperFileConfig) -> Result<(), ShipperError> {
    let shipments = &config.shipments;

    if shipments.max_size == 0 {
        return Err(ShipperError::config_validation(
            "shipments.max_size",
            "must be at least 1",
        ));
    }
    if shipments.max_size > MAX_SHIPMENT_SIZE_LIMIT {
        return Err(ShipperError::config_validation(
            "shipments.max_size",
            format!("must not exceed {MAX_SHIPMENT_SIZE_LIMIT}"),
        ));
    }
    if shipments.max_wait_minutes == 0 {
        return Err(ShipperError::config_validation(
            "shipments.max_wait_minutes",
            "must be at least 1",
        ));
    }
    if shipments.max_shipments_per_minute == 0 {
        return Err(ShipperError::config_validation(
            "shipments.max_shipments_per_minute",
            "must be at least 1",
        ));
    }
    Ok(())
}

fn validate_scheduler(config: &ShipperFileConfig) -> Result<(), ShipperError> {
    if config.scheduler.ship_interval_secs == 0 {
        return Err(ShipperError::config_validation(
            "scheduler.ship_interval_secs",
            "must be at least 1",
        ));
    }
    if config.scheduler.retry_interval_secs == 0 {
        return Err(ShipperError::config_validation(
            "scheduler.retry_interval_secs",
            "must be at least 1",
        ));
    }
    Ok(())
}
