//! PostgreSQL pool for the event store
//!
//! The pool backs [`PgEventStore`](super::PgEventStore). Every queue commit
//! holds one connection for the length of its version-guarded transaction,
//! so `max_connections` caps how many events can commit at once.

use std::time::Duration;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tracing::{debug, info};
use crate::config::DatabaseConfig;
use crate::utils::errors::MicNightError;

pub type DatabasePool = Pool<Postgres>;

/// Sizing and timeouts for the event store pool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long a commit may wait for a free connection
    pub acquire_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
}

impl PoolConfig {
    /// Pool sizing from the `[database]` settings; timeouts keep their defaults
    pub fn from_settings(database: &DatabaseConfig) -> Self {
        Self {
            url: database.url.clone(),
            max_connections: database.max_connections,
            min_connections: database.min_connections,
            ..Self::default()
        }
    }

    /// Host and database name of the URL, without credentials
    pub fn target(&self) -> &str {
        let rest = self.url.split_once("://").map_or(self.url.as_str(), |(_, rest)| rest);
        rest.rsplit_once('@').map_or(rest, |(_, target)| target)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/micnight".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(1800)),
        }
    }
}

/// Open the event store pool and make sure the server answers
pub async fn create_pool(config: &PoolConfig) -> Result<DatabasePool, MicNightError> {
    debug!(target_db = config.target(), max_connections = config.max_connections, "Opening event store pool");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .max_lifetime(config.max_lifetime)
        .connect(&config.url)
        .await?;

    health_check(&pool).await?;

    info!(target_db = config.target(), "Event store pool ready");
    Ok(pool)
}

/// Apply the events, signups and invites schema
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), MicNightError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Event store schema is up to date");
    Ok(())
}

pub async fn health_check(pool: &DatabasePool) -> Result<(), MicNightError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
