//! OHLCV candles and their resolutions
//!
//! Candle boundaries are aligned to the Unix epoch (e.g., 1m candles start
//! on minute boundaries). All timestamps are Unix milliseconds.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::TypeError;

/// Supported candle resolutions, labelled the way charting clients ask for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resolution {
    /// 1 minute
    M1,
    /// 3 minutes
    M3,
    /// 5 minutes
    M5,
    /// 15 minutes
    M15,
    /// 30 minutes
    M30,
    /// 1 hour
    H1,
    /// 2 hours
    H2,
    /// 4 hours
    H4,
    /// 1 day
    D1,
}

impl Resolution {
    /// Bucket width in seconds.
    pub fn duration_secs(&self) -> i64 {
        match self {
            Resolution::M1 => 60,
            Resolution::M3 => 3 * 60,
            Resolution::M5 => 5 * 60,
            Resolution::M15 => 15 * 60,
            Resolution::M30 => 30 * 60,
            Resolution::H1 => 3600,
            Resolution::H2 => 2 * 3600,
            Resolution::H4 => 4 * 3600,
            Resolution::D1 => 86400,
        }
    }

    /// Bucket width in milliseconds.
    pub fn duration_millis(&self) -> i64 {
        self.duration_secs() * 1000
    }

    /// All supported resolutions, ascending.
    pub fn all() -> &'static [Resolution] {
        &[
            Resolution::M1,
            Resolution::M3,
            Resolution::M5,
            Resolution::M15,
            Resolution::M30,
            Resolution::H1,
            Resolution::H2,
            Resolution::H4,
            Resolution::D1,
        ]
    }

    /// Charting label ("1", "60", "1D", ...).
    pub fn label(&self) -> &'static str {
        match self {
            Resolution::M1 => "1",
            Resolution::M3 => "3",
            Resolution::M5 => "5",
            Resolution::M15 => "15",
            Resolution::M30 => "30",
            Resolution::H1 => "60",
            Resolution::H2 => "120",
            Resolution::H4 => "240",
            Resolution::D1 => "1D",
        }
    }

    /// Start of the bucket containing `timestamp_millis` (floor).
    pub fn bucket_start(&self, timestamp_millis: i64) -> i64 {
        let width = self.duration_millis();
        timestamp_millis.div_euclid(width).saturating_mul(width)
    }

    /// Smallest bucket boundary at or after `timestamp_millis` (ceil).
    ///
    /// Saturates at `i64::MAX` when the next boundary is not representable.
    pub fn bucket_ceil(&self, timestamp_millis: i64) -> i64 {
        let width = self.duration_millis();
        let floor = self.bucket_start(timestamp_millis);
        if floor == timestamp_millis {
            floor
        } else {
            floor.saturating_add(width)
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Resolution {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::all()
            .iter()
            .copied()
            .find(|r| r.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| TypeError::UnknownResolution(s.to_string()))
    }
}

/// A single OHLCV candle, keyed externally by (market, resolution, start).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket start, Unix millis
    pub start: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    /// Create a new candle from the first trade in its bucket.
    pub fn new(start: i64, price: Decimal, size: Decimal) -> Self {
        Self {
            start,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: size,
        }
    }

    /// Fold a later trade into the candle.
    pub fn update(&mut self, price: Decimal, size: Decimal) {
        if price > self.high {
            self.high = price;
        }
        if price < self.low {
            self.low = price;
        }
        self.close = price;
        self.volume += size;
    }

    /// Validate candle integrity (OHLCV invariants).
    pub fn is_valid(&self) -> bool {
        self.high >= self.open
            && self.high >= self.close
            && self.high >= self.low
            && self.low <= self.open
            && self.low <= self.close
            && self.volume >= Decimal::ZERO
    }
}
