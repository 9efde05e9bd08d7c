//! Roster - quiz and goal participant registry
//!
//! # Startup Sequence
//! 1. Load an optional `.env` file and initialize tracing
//! 2. Load configuration from environment variables
//! 3. Open the durable store and the (lazy) distributed cache client
//! 4. Create Axum router with all endpoints
//! 5. Serve until SIGINT/SIGTERM, then close the durable store

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roster::api::create_router;
use roster::cache::{CacheCoordinator, RedisCache};
use roster::render::Templates;
use roster::service::RecordService;
use roster::store::SqliteStore;
use roster::{AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roster=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting roster server");

    let config = Config::from_env();
    info!(
        port = config.server_port,
        database = %config.database_url,
        redis = %format!("{}:{}", config.redis_host, config.redis_port),
        cache_timeout_ms = config.cache_timeout_ms,
        "configuration loaded"
    );

    let coordinator = Arc::new(build_coordinator(&config).await?);
    let templates = Templates::load(config.template_dir.as_deref())
        .context("failed to load list templates")?;
    let state = AppState::new(RecordService::new(Arc::clone(&coordinator), templates));

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    coordinator.close().await;
    info!("Server shutdown complete");
    Ok(())
}

async fn build_coordinator(config: &Config) -> anyhow::Result<CacheCoordinator> {
    let store = SqliteStore::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open durable store at {}", config.database_url))?;

    let redis = RedisCache::new(
        &config.redis_host,
        config.redis_port,
        config.redis_password.clone(),
    )
    .context("invalid distributed cache settings")?;

    Ok(CacheCoordinator::with_tier_timeout(
        Arc::new(store),
        Arc::new(redis),
        config.cache_timeout(),
    ))
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
