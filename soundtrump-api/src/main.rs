//! # SoundTrump API Server
//!
//! HTTP API for the SoundTrump rewards platform: task lifecycle, point
//! balances, referrals, reward redemption, and the Spotify token broker.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p soundtrump-api
//! ```

use soundtrump_api::{app, config::Config};
use soundtrump_shared::db::{self, DatabaseConfig};
use soundtrump_shared::events::{EventPublisher, RedisConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "soundtrump_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "SoundTrump API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let pool = db::create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    db::migrations::run_migrations(&pool).await?;

    let events = EventPublisher::connect(RedisConfig {
        url: config.redis_url.clone(),
    })
    .await?;

    let bind_address = config.bind_address();
    let state = app::AppState::new(pool, events, config);
    let router = app::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Resolves when the process receives SIGINT
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install shutdown signal handler");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
