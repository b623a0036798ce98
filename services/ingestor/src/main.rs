use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use ingestor::chain::{AccountReader, RpcAccountReader, DEFAULT_RPC_TIMEOUT};
use ingestor::{spawn_pollers, IngestorConfig, PollerSettings};
use market_data::FeedStores;
use persistence::{SqliteBackend, StorageBackend};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use types::market::MarketRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = IngestorConfig::from_env().context("invalid configuration")?;
    let registry = MarketRegistry::from_json_file(&config.markets_file)
        .with_context(|| format!("loading {}", config.markets_file.display()))?;
    info!(
        markets = registry.len(),
        resolutions = ?config.resolutions,
        interval_secs = config.interval.as_secs(),
        "Starting ingestor"
    );

    let backend: Arc<dyn StorageBackend> =
        Arc::new(SqliteBackend::open(&config.database_path, config.pool.clone())?);
    let stores = FeedStores::new(backend, config.resolutions.clone(), config.recent_trades);

    // One reader per distinct endpoint, all sharing one HTTP connection pool.
    let client = reqwest::Client::builder()
        .timeout(DEFAULT_RPC_TIMEOUT)
        .build()?;
    let mut readers: HashMap<String, Arc<dyn AccountReader>> = HashMap::new();
    for market in registry.markets() {
        let endpoint = market
            .cluster_url
            .clone()
            .unwrap_or_else(|| config.rpc_endpoint.clone());
        readers.entry(endpoint.clone()).or_insert_with(|| {
            Arc::new(RpcAccountReader::with_client(client.clone(), endpoint)) as Arc<dyn AccountReader>
        });
    }
    let default_reader: Arc<dyn AccountReader> =
        Arc::new(RpcAccountReader::with_client(client, config.rpc_endpoint.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let settings = PollerSettings {
        interval: config.interval,
    };
    let handles = spawn_pollers(
        registry.markets(),
        |market| {
            let endpoint = market.cluster_url.as_deref().unwrap_or(&config.rpc_endpoint);
            readers
                .get(endpoint)
                .cloned()
                .unwrap_or_else(|| default_reader.clone())
        },
        &stores,
        &settings,
        &shutdown_rx,
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    shutdown_tx.send(true)?;

    for handle in handles {
        if let Err(e) = handle.task.await {
            error!(market = %handle.market, error = %e, "Poller task panicked");
        }
        info!(market = %handle.market, metrics = ?handle.metrics.snapshot().export(), "Poller metrics");
    }
    Ok(())
}
