//! Market Data Store
//!
//! Persists trades produced by the ingestor and serves them back to the
//! charting gateway:
//! - OHLCV candle aggregation at every tracked resolution
//! - Bounded recent-trade log for trade-history display
//! - Per-market event-queue cursor
//!
//! Each market's cursor, candles and trade log form an independent unit;
//! nothing here coordinates across markets.
//!
//! # Architecture
//!
//! ```text
//!   MarketPoller (ingestor)          Gateway
//!        │   record / append / commit    │ query / load_recent
//!   ┌────┴──────┬───────────┬────────────┴┐
//!   │           │           │             │
//! ┌─▼──────┐ ┌──▼─────┐ ┌───▼────┐        │
//! │Candles │ │TradeLog│ │Cursor  │◄───────┘
//! └─┬──────┘ └──┬─────┘ └───┬────┘
//!   │           │           │
//! ┌─▼───────────▼───────────▼─┐
//! │   StorageBackend (pool)   │
//! └───────────────────────────┘
//! ```

use std::sync::Arc;

use persistence::StorageBackend;
use types::candle::Resolution;

pub mod candles;
pub mod cursor;
pub mod error;
pub mod trades;

pub use candles::CandleStore;
pub use cursor::CursorStore;
pub use error::MarketDataError;
pub use trades::TradeLog;

/// The three stores a poller writes to, sharing one backend.
#[derive(Clone)]
pub struct FeedStores {
    pub candles: CandleStore,
    pub trades: TradeLog,
    pub cursor: CursorStore,
}

impl FeedStores {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        resolutions: Vec<Resolution>,
        recent_trades: usize,
    ) -> Self {
        Self {
            candles: CandleStore::new(backend.clone(), resolutions),
            trades: TradeLog::new(backend.clone(), recent_trades),
            cursor: CursorStore::new(backend),
        }
    }
}
