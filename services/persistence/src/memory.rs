//! In-process storage backend
//!
//! Sharded maps so that pollers for different markets never contend on a
//! single lock. Contents are lost on restart.

use std::collections::{BTreeMap, VecDeque};

use async_trait::async_trait;
use dashmap::DashMap;
use types::candle::{Candle, Resolution};
use types::ids::MarketId;

use crate::backend::{StorageBackend, StorageError};

type Key = (MarketId, String);

#[derive(Debug, Default)]
pub struct MemoryBackend {
    numbers: DashMap<Key, u64>,
    lists: DashMap<Key, VecDeque<String>>,
    /// Candles per (market, resolution), ordered by bucket start.
    candles: DashMap<(MarketId, Resolution), BTreeMap<i64, Candle>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(market: &MarketId, key: &str) -> Key {
        (market.clone(), key.to_string())
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn load_number(&self, market: &MarketId, key: &str) -> Result<Option<u64>, StorageError> {
        Ok(self.numbers.get(&Self::key(market, key)).map(|v| *v))
    }

    async fn store_number(&self, market: &MarketId, key: &str, value: u64) -> Result<(), StorageError> {
        self.numbers.insert(Self::key(market, key), value);
        Ok(())
    }

    async fn push_recent(
        &self,
        market: &MarketId,
        key: &str,
        value: String,
        max_len: usize,
    ) -> Result<(), StorageError> {
        let mut list = self.lists.entry(Self::key(market, key)).or_default();
        list.push_front(value);
        list.truncate(max_len);
        Ok(())
    }

    async fn load_recent(&self, market: &MarketId, key: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .lists
            .get(&Self::key(market, key))
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn load_candle(
        &self,
        market: &MarketId,
        resolution: Resolution,
        start: i64,
    ) -> Result<Option<Candle>, StorageError> {
        Ok(self
            .candles
            .get(&(market.clone(), resolution))
            .and_then(|series| series.get(&start).cloned()))
    }

    async fn store_candle(
        &self,
        market: &MarketId,
        resolution: Resolution,
        candle: &Candle,
    ) -> Result<(), StorageError> {
        self.candles
            .entry((market.clone(), resolution))
            .or_default()
            .insert(candle.start, candle.clone());
        Ok(())
    }

    async fn load_candles(
        &self,
        market: &MarketId,
        resolution: Resolution,
        from: i64,
        to: i64,
    ) -> Result<Vec<Candle>, StorageError> {
        if from >= to {
            return Ok(Vec::new());
        }
        Ok(self
            .candles
            .get(&(market.clone(), resolution))
            .map(|series| series.range(from..to).map(|(_, c)| c.clone()).collect())
            .unwrap_or_default())
    }
}
