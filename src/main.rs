//! MicNight queue engine
//!
//! Main application entry point

use std::sync::Arc;
use tracing::info;

use MicNight::{
    config::{Settings, StoreBackend},
    database::{connection, EventStore, MemoryStore, PgEventStore, PoolConfig},
    utils::logging,
    QueueEngine,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;
    settings.validate()?;

    // Initialize logging
    let _guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", MicNight::info());

    let store: Arc<dyn EventStore> = match settings.store.backend {
        StoreBackend::Postgres => {
            info!("Connecting to database...");
            let pool = connection::create_pool(&PoolConfig::from_settings(&settings.database)).await?;

            info!("Running database migrations...");
            connection::run_migrations(&pool).await?;

            Arc::new(PgEventStore::new(pool))
        }
        StoreBackend::Memory => {
            info!("Using in-memory event store");
            Arc::new(MemoryStore::new())
        }
    };

    let engine = QueueEngine::with_defaults(store, settings.queue.clone());
    engine.health_check().await?;

    info!(
        backend = ?settings.store.backend,
        conflict_retries = settings.queue.conflict_retries,
        "Queue engine is ready"
    );

    Ok(())
}
