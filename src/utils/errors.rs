//! Error handling for MicNight
//!
//! This module defines the main error type used throughout the queue engine.
//! Logical errors are never retried; only `Conflict` is transient.

use thiserror::Error;

/// Main error type for MicNight application
#[derive(Error, Debug)]
pub enum MicNightError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Authentication required")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Event {event_id} is full ({max_performers} performers)")]
    CapacityExceeded { event_id: i64, max_performers: i32 },

    #[error("User {user_id} is already signed up for event {event_id}")]
    DuplicateSignup { event_id: i64, user_id: i64 },

    #[error("Signups for event {event_id} are not open right now")]
    OutsideSignupWindow { event_id: i64 },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No candidates remaining for event {event_id}")]
    NoCandidatesRemaining { event_id: i64 },

    #[error("Invite {invite_id} was already answered")]
    AlreadyResponded { invite_id: i64 },

    #[error("Concurrent modification of event {event_id}")]
    Conflict { event_id: i64 },

    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for MicNight operations
pub type Result<T> = std::result::Result<T, MicNightError>;

impl MicNightError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        MicNightError::NotFound { entity, id }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        MicNightError::Forbidden(reason.into())
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        MicNightError::Validation(reason.into())
    }

    pub fn transition(from: impl ToString, to: impl ToString) -> Self {
        MicNightError::InvalidTransition { from: from.to_string(), to: to.to_string() }
    }

    /// Check if the error is recoverable by retrying the same request
    pub fn is_recoverable(&self) -> bool {
        match self {
            MicNightError::Conflict { .. } => true,
            MicNightError::Database(sqlx::Error::PoolTimedOut) => true,
            MicNightError::Database(_) => false,
            MicNightError::Migration(_) => false,
            MicNightError::Config(_) => false,
            MicNightError::NotFound { .. } => false,
            MicNightError::Unauthorized => false,
            MicNightError::Forbidden(_) => false,
            MicNightError::InvalidTransition { .. } => false,
            MicNightError::CapacityExceeded { .. } => false,
            MicNightError::DuplicateSignup { .. } => false,
            MicNightError::OutsideSignupWindow { .. } => false,
            MicNightError::Validation(_) => false,
            MicNightError::NoCandidatesRemaining { .. } => false,
            MicNightError::AlreadyResponded { .. } => false,
            MicNightError::CorruptRecord(_) => false,
            MicNightError::Serialization(_) => false,
            MicNightError::Io(_) => true,
        }
    }

    /// Whether the engine retries this error internally
    pub fn is_conflict(&self) -> bool {
        matches!(self, MicNightError::Conflict { .. })
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            MicNightError::Database(_) => ErrorSeverity::Critical,
            MicNightError::Migration(_) => ErrorSeverity::Critical,
            MicNightError::Config(_) => ErrorSeverity::Critical,
            MicNightError::CorruptRecord(_) => ErrorSeverity::Critical,
            MicNightError::Unauthorized => ErrorSeverity::Warning,
            MicNightError::Forbidden(_) => ErrorSeverity::Warning,
            MicNightError::Conflict { .. } => ErrorSeverity::Warning,
            MicNightError::Serialization(_) | MicNightError::Io(_) => ErrorSeverity::Error,
            _ => ErrorSeverity::Info,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
