//! Types library for the event-queue trade feed
//!
//! Shared data model used by the ingestor, the storage layer and the query
//! gateway. Nothing in here performs I/O except registry loading.
//!
//! # Modules
//! - `ids`: Identifiers (MarketId, Address)
//! - `numeric`: Native fixed-point scaling (TokenDecimals)
//! - `trade`: Canonical trade records
//! - `candle`: Resolutions and OHLCV candles
//! - `market`: Static market configuration and registry
//! - `errors`: Error taxonomy

// Public modules
pub mod ids;
pub mod numeric;
pub mod trade;
pub mod candle;
pub mod market;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::trade::*;
    pub use crate::candle::*;
    pub use crate::market::*;
    pub use crate::errors::*;
}
