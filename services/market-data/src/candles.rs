//! OHLCV Candle Store
//!
//! Folds trades into OHLCV (Open, High, Low, Close, Volume) candles across
//! every tracked resolution and answers range queries for charting.
//!
//! Candle boundaries are aligned to epoch (e.g., 1m candles start on minute
//! boundaries). Candles are never explicitly closed: a bucket simply stops
//! changing once no more trades can land in it, and queries return whatever
//! is stored.
//!
//! `close` is only correct when a market's trades are applied in
//! non-decreasing timestamp order. A single poller per market applies them
//! sequentially in queue order, which guarantees this.
//!
//! Re-applying a trade is not detected: at-least-once delivery means a
//! replayed cycle adds its volume again.

use std::sync::Arc;

use persistence::StorageBackend;
use tracing::trace;
use types::candle::{Candle, Resolution};
use types::ids::MarketId;
use types::trade::Trade;

use crate::error::MarketDataError;

/// Snap a query range onto bucket boundaries.
///
/// `from` is floored and `to` is ceiled to the resolution. Equal bounds after
/// snapping are widened by one bucket so the caller always receives at least
/// one bucket's worth of range. Inverted bounds give an empty range.
pub fn snap_range(resolution: Resolution, from: i64, to: i64) -> (i64, i64) {
    let start = resolution.bucket_start(from);
    if from > to {
        return (start, start);
    }
    let mut end = resolution.bucket_ceil(to);
    if start == end {
        end = end.saturating_add(resolution.duration_millis());
    }
    (start, end)
}

#[derive(Clone)]
pub struct CandleStore {
    backend: Arc<dyn StorageBackend>,
    resolutions: Arc<[Resolution]>,
}

impl CandleStore {
    pub fn new(backend: Arc<dyn StorageBackend>, resolutions: Vec<Resolution>) -> Self {
        let mut resolutions = resolutions;
        resolutions.sort();
        resolutions.dedup();
        Self {
            backend,
            resolutions: resolutions.into(),
        }
    }

    /// Resolutions maintained on every recorded trade.
    pub fn resolutions(&self) -> &[Resolution] {
        &self.resolutions
    }

    /// Fold one trade into its bucket at every tracked resolution.
    pub async fn record_trade(&self, market: &MarketId, trade: &Trade) -> Result<(), MarketDataError> {
        for &resolution in self.resolutions.iter() {
            let start = resolution.bucket_start(trade.observed_at);
            let candle = match self.backend.load_candle(market, resolution, start).await? {
                Some(mut candle) => {
                    candle.update(trade.price, trade.size);
                    candle
                }
                None => Candle::new(start, trade.price, trade.size),
            };
            trace!(
                market = %market,
                resolution = %resolution,
                start,
                close = %candle.close,
                volume = %candle.volume,
                "Candle updated"
            );
            self.backend.store_candle(market, resolution, &candle).await?;
        }
        Ok(())
    }

    /// Candles whose bucket start lies in the snapped range, ascending.
    ///
    /// An empty range is not an error.
    pub async fn query(
        &self,
        market: &MarketId,
        resolution: Resolution,
        from: i64,
        to: i64,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let (from, to) = snap_range(resolution, from, to);
        Ok(self.backend.load_candles(market, resolution, from, to).await?)
    }
}
