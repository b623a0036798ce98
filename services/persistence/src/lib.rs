//! Storage backends for the trade feed
//!
//! The feed needs only three primitives from a store: a scalar per market
//! (the cursor), a bounded newest-first list per market (recent trades) and
//! structured candle records keyed by (market, resolution, bucket start).
//! Any backend offering these is sufficient; no transactions span markets.
//!
//! - `backend`: the `StorageBackend` seam and `StorageError`
//! - `memory`: in-process backend (tests, ephemeral runs)
//! - `sqlite`: pooled on-disk backend shared by pollers and the gateway

pub mod backend;
pub mod memory;
pub mod sqlite;

pub use backend::{StorageBackend, StorageError};
pub use memory::MemoryBackend;
pub use sqlite::{PoolSettings, SqliteBackend};
