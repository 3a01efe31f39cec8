//! # SoundTrump Worker
//!
//! Background worker for the SoundTrump platform. Runs the expiration
//! sweeper, which periodically removes expired tasks along with their stored
//! media and tells subscribers to refetch the task catalog.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p soundtrump-worker
//! ```

use soundtrump_shared::db::{self, DatabaseConfig};
use soundtrump_shared::events::{EventPublisher, RedisConfig};
use soundtrump_shared::storage::{StorageClient, StorageConfig};
use soundtrump_worker::sweeper::{Sweeper, SweeperConfig};
use std::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "soundtrump_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "SoundTrump Worker v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    dotenvy::dotenv().ok();

    let database_url = env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

    let pool = db::create_pool(DatabaseConfig {
        url: database_url,
        ..Default::default()
    })
    .await?;

    db::migrations::run_migrations(&pool).await?;

    let events = EventPublisher::connect(RedisConfig::from_env()?).await?;

    let storage = StorageClient::new(StorageConfig {
        base_url: env::var("STORAGE_BASE_URL")
            .map_err(|_| anyhow::anyhow!("STORAGE_BASE_URL environment variable is required"))?,
        bucket: env::var("STORAGE_BUCKET").unwrap_or_else(|_| "task-media".to_string()),
        service_key: env::var("STORAGE_SERVICE_KEY")
            .map_err(|_| anyhow::anyhow!("STORAGE_SERVICE_KEY environment variable is required"))?,
    });

    let sweeper = Sweeper::new(pool.clone(), storage, events, SweeperConfig::from_env());

    sweeper.run(shutdown_signal()).await;

    db::pool::close_pool(pool).await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Resolves when the process receives SIGINT
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install shutdown signal handler");
        return;
    }
    tracing::info!("Shutdown signal received");
}
