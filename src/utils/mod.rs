//! Utility modules
//!
//! This module contains common utilities used throughout the application,
//! including error handling, logging setup, conflict retries and randomness.

pub mod errors;
pub mod logging;
pub mod random;
pub mod retry;

pub use errors::{MicNightError, Result};
pub use random::{RandomSource, ThreadRandom, SeededRandom};
