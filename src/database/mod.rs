//! Database module
//!
//! This module holds the abstract event store and its implementations

pub mod connection;
pub mod memory;
pub mod postgres;
pub mod store;

// Re-export commonly used database components
pub use connection::{DatabasePool, PoolConfig, create_pool, run_migrations, health_check};
pub use memory::MemoryStore;
pub use postgres::PgEventStore;
pub use store::{EventStore, EventChanges, Committed};
