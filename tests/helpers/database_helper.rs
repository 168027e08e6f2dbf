//! Database test helpers
//!
//! PostgreSQL tests run only when `TEST_DATABASE_URL` points at a scratch
//! database; every helper here is a no-op otherwise.

use MicNight::database::{create_pool, run_migrations, DatabasePool, PoolConfig};

pub struct TestDatabase {
    pub pool: DatabasePool,
}

impl TestDatabase {
    /// Connect and migrate, or `None` when no test database is configured
    pub async fn connect() -> Option<Self> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let config = PoolConfig {
            url,
            max_connections: 5,
            ..PoolConfig::default()
        };
        let pool = create_pool(&config).await.expect("Failed to connect to test database");
        run_migrations(&pool).await.expect("Failed to run migrations");

        let db = Self { pool };
        db.cleanup().await;
        Some(db)
    }

    pub async fn cleanup(&self) {
        sqlx::query("TRUNCATE invites, signups, events RESTART IDENTITY CASCADE")
            .execute(&self.pool)
            .await
            .expect("Failed to truncate tables");
    }
}
