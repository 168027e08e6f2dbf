//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub store: StoreConfig,
    pub queue: QueueConfig,
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Which store implementation backs the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Postgres,
}

/// Store selection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

/// Shortest slot a performer can be given, in minutes
pub const MIN_PERFORMANCE_LENGTH: i32 = 1;
/// Longest slot a performer can be given, in minutes
pub const MAX_PERFORMANCE_LENGTH: i32 = 60;

/// Queue engine tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    /// Attempts made for an operation that hits an optimistic-concurrency conflict
    pub conflict_retries: u32,
    /// Slot length in minutes for new events that do not specify one
    pub default_performance_length: i32,
    pub min_performance_length: i32,
    pub max_performance_length: i32,
    /// Performance name used when an invite is accepted without details
    pub default_performance_name: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: String,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        Self::from_file("micnight")
    }

    /// Load settings from the given file (extension optional) layered over
    /// the defaults, with `MICNIGHT_*` environment variables on top
    pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
        let defaults = config::Config::try_from(&Settings::default())?;

        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("MICNIGHT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::MicNightError> {
        super::validation::validate_settings(self)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            conflict_retries: 3,
            default_performance_length: 10,
            min_performance_length: MIN_PERFORMANCE_LENGTH,
            max_performance_length: MAX_PERFORMANCE_LENGTH,
            default_performance_name: "Performance".to_string(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgresql://localhost/micnight".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            store: StoreConfig {
                backend: StoreBackend::Memory,
            },
            queue: QueueConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: "logs".to_string(),
            },
        }
    }
}
