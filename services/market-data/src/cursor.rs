//! Per-market event-queue cursor
//!
//! The cursor is the sequence number of the last consumed queue event. It is
//! committed only after the cycle's trades are stored, so a crash in between
//! replays the same events on restart instead of losing them.

use std::sync::Arc;

use persistence::StorageBackend;
use types::ids::MarketId;

use crate::error::MarketDataError;

const CURSOR_KEY: &str = "LASTSEQ";

#[derive(Clone)]
pub struct CursorStore {
    backend: Arc<dyn StorageBackend>,
}

impl CursorStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Last committed sequence number, `None` before the first commit.
    pub async fn load(&self, market: &MarketId) -> Result<Option<u64>, MarketDataError> {
        Ok(self.backend.load_number(market, CURSOR_KEY).await?)
    }

    pub async fn commit(&self, market: &MarketId, seq_num: u64) -> Result<(), MarketDataError> {
        Ok(self.backend.store_number(market, CURSOR_KEY, seq_num).await?)
    }
}
