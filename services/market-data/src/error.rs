use persistence::StorageError;
use thiserror::Error;

/// Errors surfaced by the candle store, trade log and cursor.
#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for MarketDataError {
    fn from(err: serde_json::Error) -> Self {
        MarketDataError::Serialization(err.to_string())
    }
}
