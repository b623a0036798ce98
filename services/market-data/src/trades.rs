//! Recent-trade log for trade-history display
//!
//! A fixed-size, oldest-evicted list of trades per market. It is a display
//! cache, not the system of record: candle aggregation never reads from it.

use std::sync::Arc;

use persistence::StorageBackend;
use tracing::warn;
use types::ids::MarketId;
use types::trade::Trade;

use crate::error::MarketDataError;

const TRADES_KEY: &str = "TRADES";

/// Default number of trades retained per market.
pub const DEFAULT_RECENT_TRADES: usize = 100;

#[derive(Clone)]
pub struct TradeLog {
    backend: Arc<dyn StorageBackend>,
    max_history: usize,
}

impl TradeLog {
    pub fn new(backend: Arc<dyn StorageBackend>, max_history: usize) -> Self {
        Self {
            backend,
            max_history: max_history.max(1),
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Add a trade, evicting the oldest once the log is full.
    pub async fn append(&self, market: &MarketId, trade: &Trade) -> Result<(), MarketDataError> {
        let encoded = serde_json::to_string(trade)?;
        self.backend
            .push_recent(market, TRADES_KEY, encoded, self.max_history)
            .await?;
        Ok(())
    }

    /// Retained trades, newest first.
    ///
    /// Entries that no longer decode are skipped rather than failing the
    /// whole read.
    pub async fn load_recent(&self, market: &MarketId) -> Result<Vec<Trade>, MarketDataError> {
        let raw = self.backend.load_recent(market, TRADES_KEY).await?;
        Ok(raw
            .iter()
            .filter_map(|entry| match serde_json::from_str::<Trade>(entry) {
                Ok(trade) => Some(trade),
                Err(e) => {
                    warn!(market = %market, error = %e, "Skipping undecodable trade log entry");
                    None
                }
            })
            .collect())
    }
}
