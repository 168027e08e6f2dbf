//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the queue engine.

use tracing::{info, warn, debug};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use crate::config::LoggingConfig;
use crate::utils::errors::{MicNightError, Result};

/// Initialize logging based on configuration
///
/// The returned guard must be held for as long as file logging should flush.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(&config.file_path, "micnight.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(non_blocking))
        .try_init()
        .map_err(|e| MicNightError::Config(format!("Failed to install subscriber: {}", e)))?;

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log event management actions
pub fn log_event_action(event_id: i64, action: &str, user_id: Option<i64>, details: Option<&str>) {
    info!(
        event_id = event_id,
        action = action,
        user_id = user_id,
        details = details,
        "Event action performed"
    );
}

/// Log a change to the ordered signup list of an event
pub fn log_queue_change(event_id: i64, action: &str, affected: usize) {
    info!(
        event_id = event_id,
        action = action,
        affected = affected,
        "Queue updated"
    );
}

/// Log an optimistic concurrency collision that is about to be retried
pub fn log_conflict_retry(event_id: i64, operation: &str, attempt: u32, max_attempts: u32) {
    warn!(
        event_id = event_id,
        operation = operation,
        attempt = attempt,
        max_attempts = max_attempts,
        "Concurrent modification detected, retrying"
    );
}

/// Log store operations
pub fn log_store_operation(operation: &str, event_id: i64, duration_ms: u64, success: bool) {
    if success {
        debug!(
            operation = operation,
            event_id = event_id,
            duration_ms = duration_ms,
            "Store operation completed"
        );
    } else {
        warn!(
            operation = operation,
            event_id = event_id,
            duration_ms = duration_ms,
            "Store operation failed"
        );
    }
}
