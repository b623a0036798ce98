//! Event-queue ingestor
//!
//! Polls each configured market's on-chain event queue, turns new taker
//! fills into trades and hands them to the market-data stores.
//!
//! # Modules
//! - `layout`: Shared account framing (markers, flags, byte readers)
//! - `event_queue`: Ring-buffer decoder with cursor/gap/reset handling
//! - `market_state`: Market and mint account decoding
//! - `extractor`: Taker-fill to `Trade` conversion
//! - `chain`: `AccountReader` seam and JSON-RPC client
//! - `poller`: Per-market fetch/decode/persist loop
//! - `metrics`: Per-market counters
//! - `config`: Environment configuration

pub mod chain;
pub mod config;
pub mod error;
pub mod event_queue;
pub mod extractor;
pub mod layout;
pub mod market_state;
pub mod metrics;
pub mod poller;

pub use chain::{AccountReader, ChainError, InMemoryAccounts, RpcAccountReader};
pub use config::IngestorConfig;
pub use error::PollError;
pub use event_queue::{decode_recent_events, RecentEvents, SequencedEvent};
pub use extractor::{extract, extract_trades};
pub use layout::DecodeError;
pub use metrics::{MetricsSnapshot, PollerMetrics};
pub use poller::{spawn_pollers, CycleReport, MarketPoller, PollerHandle, PollerSettings, PollerState};
