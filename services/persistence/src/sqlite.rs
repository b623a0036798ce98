//! SQLite backend behind a bounded connection pool
//!
//! One database file is shared by every poller and by the gateway. The pool
//! caps open connections at `max_size`; a caller that finds it exhausted
//! waits up to `acquire_timeout` before failing with `StorageError::Pool`.
//! All SQLite work runs on the blocking thread pool so a slow disk never
//! stalls other markets' tasks.
//!
//! # Schema
//! ```text
//! numbers(market, key, value)                        PK(market, key)
//! recent(id, market, key, value)                     newest = highest id
//! candles(market, resolution, start, o, h, l, c, v)  PK(market, resolution, start)
//! ```
//! Decimals are stored as text so they round-trip exactly.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use tracing::info;
use types::candle::{Candle, Resolution};
use types::ids::MarketId;

use crate::backend::{StorageBackend, StorageError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS numbers (
    market TEXT NOT NULL,
    key    TEXT NOT NULL,
    value  INTEGER NOT NULL,
    PRIMARY KEY (market, key)
);
CREATE TABLE IF NOT EXISTS recent (
    id     INTEGER PRIMARY KEY AUTOINCREMENT,
    market TEXT NOT NULL,
    key    TEXT NOT NULL,
    value  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS recent_by_market ON recent (market, key, id);
CREATE TABLE IF NOT EXISTS candles (
    market     TEXT NOT NULL,
    resolution INTEGER NOT NULL,
    start      INTEGER NOT NULL,
    open       TEXT NOT NULL,
    high       TEXT NOT NULL,
    low        TEXT NOT NULL,
    close      TEXT NOT NULL,
    volume     TEXT NOT NULL,
    PRIMARY KEY (market, resolution, start)
);
";

/// Connection pool limits.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    /// Maximum open connections shared by all users of the backend.
    pub max_size: u32,
    /// How long an acquiring task waits on an exhausted pool.
    pub acquire_timeout: Duration,
    /// SQLite busy timeout for writer contention.
    pub busy_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_size: 200,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Clone)]
pub struct SqliteBackend {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteBackend {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn open(path: &Path, settings: PoolSettings) -> Result<Self, StorageError> {
        let busy_timeout = settings.busy_timeout;
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")
        });
        let pool = Pool::builder()
            .max_size(settings.max_size)
            .min_idle(Some(settings.max_size.min(4)))
            .connection_timeout(settings.acquire_timeout)
            .build(manager)?;

        pool.get()?.execute_batch(SCHEMA)?;

        info!(
            path = %path.display(),
            max_size = settings.max_size,
            acquire_timeout_ms = settings.acquire_timeout.as_millis() as u64,
            "SQLite backend opened"
        );
        Ok(Self { pool })
    }

    /// Run `op` on a pooled connection from the blocking thread pool.
    async fn with_conn<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            op(&mut conn)
        })
        .await
        .map_err(|e| StorageError::Task(e.to_string()))?
    }
}

fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, StorageError> {
    Decimal::from_str(raw).map_err(|e| StorageError::Corrupt {
        key: field.to_string(),
        detail: format!("{raw:?}: {e}"),
    })
}

type CandleRow = (i64, String, String, String, String, String);

fn candle_from_row(row: CandleRow) -> Result<Candle, StorageError> {
    let (start, open, high, low, close, volume) = row;
    Ok(Candle {
        start,
        open: parse_decimal("open", &open)?,
        high: parse_decimal("high", &high)?,
        low: parse_decimal("low", &low)?,
        close: parse_decimal("close", &close)?,
        volume: parse_decimal("volume", &volume)?,
    })
}

fn read_candle_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CandleRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    async fn load_number(&self, market: &MarketId, key: &str) -> Result<Option<u64>, StorageError> {
        let (market, key) = (market.to_string(), key.to_string());
        self.with_conn(move |conn| {
            let value: Option<i64> = conn
                .query_row(
                    "SELECT value FROM numbers WHERE market = ?1 AND key = ?2",
                    params![market, key],
                    |row| row.get(0),
                )
                .optional()?;
            // u64 is stored bit-for-bit in SQLite's signed INTEGER
            Ok(value.map(|v| v as u64))
        })
        .await
    }

    async fn store_number(&self, market: &MarketId, key: &str, value: u64) -> Result<(), StorageError> {
        let (market, key) = (market.to_string(), key.to_string());
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO numbers (market, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT (market, key) DO UPDATE SET value = excluded.value",
                params![market, key, value as i64],
            )?;
            Ok(())
        })
        .await
    }

    async fn push_recent(
        &self,
        market: &MarketId,
        key: &str,
        value: String,
        max_len: usize,
    ) -> Result<(), StorageError> {
        let (market, key) = (market.to_string(), key.to_string());
        let max_len = i64::try_from(max_len).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO recent (market, key, value) VALUES (?1, ?2, ?3)",
                params![market, key, value],
            )?;
            tx.execute(
                "DELETE FROM recent
                 WHERE market = ?1 AND key = ?2 AND id NOT IN (
                     SELECT id FROM recent WHERE market = ?1 AND key = ?2
                     ORDER BY id DESC LIMIT ?3
                 )",
                params![market, key, max_len],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn load_recent(&self, market: &MarketId, key: &str) -> Result<Vec<String>, StorageError> {
        let (market, key) = (market.to_string(), key.to_string());
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT value FROM recent WHERE market = ?1 AND key = ?2 ORDER BY id DESC",
            )?;
            let values = stmt
                .query_map(params![market, key], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(values)
        })
        .await
    }

    async fn load_candle(
        &self,
        market: &MarketId,
        resolution: Resolution,
        start: i64,
    ) -> Result<Option<Candle>, StorageError> {
        let market = market.to_string();
        let resolution = resolution.duration_secs();
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT start, open, high, low, close, volume FROM candles
                     WHERE market = ?1 AND resolution = ?2 AND start = ?3",
                    params![market, resolution, start],
                    read_candle_row,
                )
                .optional()?;
            row.map(candle_from_row).transpose()
        })
        .await
    }

    async fn store_candle(
        &self,
        market: &MarketId,
        resolution: Resolution,
        candle: &Candle,
    ) -> Result<(), StorageError> {
        let market = market.to_string();
        let resolution = resolution.duration_secs();
        let candle = candle.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO candles (market, resolution, start, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT (market, resolution, start) DO UPDATE SET
                     open = excluded.open, high = excluded.high, low = excluded.low,
                     close = excluded.close, volume = excluded.volume",
                params![
                    market,
                    resolution,
                    candle.start,
                    candle.open.to_string(),
                    candle.high.to_string(),
                    candle.low.to_string(),
                    candle.close.to_string(),
                    candle.volume.to_string(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn load_candles(
        &self,
        market: &MarketId,
        resolution: Resolution,
        from: i64,
        to: i64,
    ) -> Result<Vec<Candle>, StorageError> {
        let market = market.to_string();
        let resolution = resolution.duration_secs();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT start, open, high, low, close, volume FROM candles
                 WHERE market = ?1 AND resolution = ?2 AND start >= ?3 AND start < ?4
                 ORDER BY start ASC",
            )?;
            let rows = stmt
                .query_map(params![market, resolution, from, to], read_candle_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(candle_from_row).collect()
        })
        .await
    }
}
