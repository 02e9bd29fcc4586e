//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{GatherlyError, Result};

use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_store_config(&settings.store)?;
    validate_transaction_config(&settings.transaction)?;
    validate_logging_config(&settings.logging)?;
    Ok(())
}

/// Validate entity store configuration
fn validate_store_config(config: &super::StoreConfig) -> Result<()> {
    if config.path.is_empty() {
        return Err(GatherlyError::Config(
            "Store path is required".to_string(),
        ));
    }
    Ok(())
}

/// Validate transaction retry configuration
fn validate_transaction_config(config: &super::TransactionConfig) -> Result<()> {
    if config.max_attempts == 0 {
        return Err(GatherlyError::Config(
            "Transaction max attempts must be greater than 0".to_string(),
        ));
    }
    if config.base_delay_ms > config.max_delay_ms {
        return Err(GatherlyError::Config(
            "Transaction base delay cannot be greater than max delay".to_string(),
        ));
    }
    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(GatherlyError::Config("Log level is required".to_string()));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(GatherlyError::Config(format!(
            "Invalid log level: {}. Valid levels: {:?}",
            config.level, valid_levels
        )));
    }

    Ok(())
}
