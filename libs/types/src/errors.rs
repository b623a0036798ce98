//! Error types for the shared data model
//!
//! Comprehensive error taxonomy using thiserror

use thiserror::Error;

/// Errors raised while constructing or loading model types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypeError {
    #[error("Invalid market id: {0} (expected BASE/QUOTE)")]
    InvalidMarketId(String),

    #[error("Invalid address: {value} ({reason})")]
    InvalidAddress { value: String, reason: String },

    #[error("Unknown resolution: {0}")]
    UnknownResolution(String),

    #[error("Unsupported token decimals: {0}")]
    UnsupportedDecimals(u8),

    #[error("Registry error: {0}")]
    Registry(String),
}
