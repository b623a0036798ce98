//! Canonical trade records
//!
//! A `Trade` is produced only from a taker fill and is never mutated after
//! it has been persisted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Taker direction of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    /// Taker bought (crossed the ask)
    Buy,
    /// Taker sold (crossed the bid)
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single executed trade as observed by the ingestor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub price: Decimal,
    pub side: TradeSide,
    pub size: Decimal,
    /// Unix millis when the ingestor observed the fill (not chain time)
    pub observed_at: i64,
}

impl Trade {
    pub fn new(price: Decimal, side: TradeSide, size: Decimal, observed_at: i64) -> Self {
        Self {
            price,
            side,
            size,
            observed_at,
        }
    }
}
