mod config;
mod error;
mod handlers;
mod router;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use config::GatewayConfig;
use persistence::{SqliteBackend, StorageBackend};
use router::create_router;
use state::AppState;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use types::market::MarketRegistry;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = GatewayConfig::from_env();
    let registry = MarketRegistry::from_json_file(&config.markets_file)
        .with_context(|| format!("loading {}", config.markets_file.display()))?;
    tracing::info!(markets = registry.len(), "Starting Gateway API service");

    let backend: Arc<dyn StorageBackend> =
        Arc::new(SqliteBackend::open(&config.database_path, config.pool.clone())?);
    let state = AppState::new(registry, backend, config.recent_trades);

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
