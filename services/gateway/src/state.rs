use std::sync::Arc;

use market_data::{CandleStore, TradeLog};
use persistence::StorageBackend;
use types::market::MarketRegistry;

/// Read-only handles shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<MarketRegistry>,
    pub candles: CandleStore,
    pub trades: TradeLog,
}

impl AppState {
    pub fn new(registry: MarketRegistry, backend: Arc<dyn StorageBackend>, recent_trades: usize) -> Self {
        Self {
            registry: Arc::new(registry),
            // Queries do not depend on the tracked list; any stored resolution can be read.
            candles: CandleStore::new(backend.clone(), Vec::new()),
            trades: TradeLog::new(backend, recent_trades),
        }
    }
}
