//! Mini Toolkit server
//!
//! Serves the cache and rate limiter over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mini_toolkit::api::{create_router, AppState};
use mini_toolkit::storage::{ExternalStore, RedisStore, StorageKind};
use mini_toolkit::Config;

/// Main entry point for the toolkit server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Connect to Redis when `REDIS_URL` is set
/// 4. Build the cache and rate limiter
/// 5. Start HTTP server on configured port
/// 6. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mini_toolkit=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Mini Toolkit server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: port={}, cache_ttl={}, rate_limit={} per {}, storage={}",
        config.server_port,
        config.cache_ttl,
        config.rate_limit,
        config.rate_limit_interval,
        config.rate_limit_storage
    );

    let external: Option<Arc<dyn ExternalStore>> = match &config.redis_url {
        Some(url) => Some(Arc::new(
            RedisStore::connect(url)
                .await
                .with_context(|| format!("failed to connect to {}", url))?,
        )),
        None => None,
    };
    if config.rate_limit_storage == StorageKind::External && external.is_none() {
        warn!("RATE_LIMIT_STORAGE=redis without REDIS_URL; /limit will fail");
    }

    let port = config.server_port;
    let app = create_router(AppState::from_config(config, external));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
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
