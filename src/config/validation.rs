//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{MicNightError, Result};
use super::{Settings, StoreBackend, MAX_PERFORMANCE_LENGTH, MIN_PERFORMANCE_LENGTH};

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.store.backend == StoreBackend::Postgres {
        validate_database_config(&settings.database)?;
    }
    validate_queue_config(&settings.queue)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(MicNightError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(MicNightError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(MicNightError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    Ok(())
}

/// Validate queue engine configuration
fn validate_queue_config(config: &super::QueueConfig) -> Result<()> {
    if config.conflict_retries == 0 {
        return Err(MicNightError::Config(
            "Conflict retries must be at least 1".to_string()
        ));
    }

    if config.min_performance_length < MIN_PERFORMANCE_LENGTH
        || config.max_performance_length > MAX_PERFORMANCE_LENGTH
        || config.min_performance_length > config.max_performance_length
    {
        return Err(MicNightError::Config(format!(
            "Invalid performance length bounds: [{}, {}]",
            config.min_performance_length, config.max_performance_length
        )));
    }

    if !(config.min_performance_length..=config.max_performance_length)
        .contains(&config.default_performance_length)
    {
        return Err(MicNightError::Config(
            "Default performance length must be within the configured bounds".to_string()
        ));
    }

    if config.default_performance_name.trim().is_empty() {
        return Err(MicNightError::Config(
            "Default performance name is required".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(MicNightError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(MicNightError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}
