//! MicNight queue engine
//!
//! Event lifecycle and performance queue management for open-mic nights.
//! This library provides the signup registry, the four queue disciplines,
//! host reordering, booked mic invitations and the stores they run on.

#![allow(non_snake_case)]

pub mod config;
pub mod services;
pub mod models;
pub mod database;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{MicNightError, Result};

// Re-export main components for easy access
pub use database::{EventStore, MemoryStore, PgEventStore};
pub use services::{AuthContext, QueueEngine};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
