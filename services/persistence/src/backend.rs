//! Storage seam shared by every backend.

use async_trait::async_trait;
use thiserror::Error;
use types::candle::{Candle, Resolution};
use types::ids::MarketId;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Blocking task failed: {0}")]
    Task(String),

    #[error("Corrupt value for {key}: {detail}")]
    Corrupt { key: String, detail: String },

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

// ── Backend ─────────────────────────────────────────────────────────

/// Primitive operations required by the candle store, trade log and cursor.
///
/// Every operation is scoped to a single market. Implementations must be
/// safe to share between many concurrently running pollers.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read a scalar stored under `key`.
    async fn load_number(&self, market: &MarketId, key: &str) -> Result<Option<u64>, StorageError>;

    /// Overwrite a scalar stored under `key`.
    async fn store_number(&self, market: &MarketId, key: &str, value: u64) -> Result<(), StorageError>;

    /// Prepend `value` to the list under `key`, keeping at most `max_len`
    /// entries (oldest evicted).
    async fn push_recent(
        &self,
        market: &MarketId,
        key: &str,
        value: String,
        max_len: usize,
    ) -> Result<(), StorageError>;

    /// Entries of the list under `key`, newest first.
    async fn load_recent(&self, market: &MarketId, key: &str) -> Result<Vec<String>, StorageError>;

    async fn load_candle(
        &self,
        market: &MarketId,
        resolution: Resolution,
        start: i64,
    ) -> Result<Option<Candle>, StorageError>;

    /// Insert or replace the candle at `(market, resolution, candle.start)`.
    async fn store_candle(
        &self,
        market: &MarketId,
        resolution: Resolution,
        candle: &Candle,
    ) -> Result<(), StorageError>;

    /// Candles with `from <= start < to`, ascending by start.
    async fn load_candles(
        &self,
        market: &MarketId,
        resolution: Resolution,
        from: i64,
        to: i64,
    ) -> Result<Vec<Candle>, StorageError>;
}
