//! Per-market polling loop
//!
//! One `MarketPoller` per configured market, each on its own task:
//!
//! ```text
//! Idle ──► Fetching ──► Decoding ──► Persisting ──► Sleeping ──► Idle
//!  (cursor)   (bytes)     (events,      (trade log,     (interval)
//!               │           trades)      candles,
//!               │             │          then cursor)
//!               └── error ────┴──────────────────────────► Sleeping
//! ```
//!
//! The cursor is committed last. A cycle that fails or is abandoned at
//! shutdown leaves it where it was, so its events are read again next time.
//! Pollers share nothing but the storage backend; a market whose account is
//! missing or malformed keeps failing on its own without affecting others.

use std::sync::Arc;
use std::time::Duration;

use market_data::FeedStores;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};
use types::ids::{Address, MarketId};
use types::market::MarketConfig;
use types::numeric::TokenDecimals;

use crate::chain::AccountReader;
use crate::error::PollError;
use crate::event_queue::decode_recent_events;
use crate::extractor::extract;
use crate::market_state::{decode_mint_decimals, MarketState};
use crate::metrics::PollerMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Fetching,
    Decoding,
    Persisting,
    Sleeping,
}

#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub interval: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
        }
    }
}

/// Outcome of one successful cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Trades persisted
    pub trades: usize,
    /// Events decoded past the cursor
    pub events: usize,
    pub missed: u64,
    pub reset: bool,
    /// Cursor value after the cycle
    pub seq_num: u64,
}

/// Chain facts fixed for a market's lifetime.
#[derive(Debug, Clone, Copy)]
struct ResolvedMarket {
    event_queue: Address,
    decimals: TokenDecimals,
}

pub struct MarketPoller {
    market: MarketConfig,
    reader: Arc<dyn AccountReader>,
    stores: FeedStores,
    settings: PollerSettings,
    metrics: Arc<PollerMetrics>,
    resolved: Option<ResolvedMarket>,
    state: PollerState,
}

impl MarketPoller {
    pub fn new(
        market: MarketConfig,
        reader: Arc<dyn AccountReader>,
        stores: FeedStores,
        settings: PollerSettings,
        metrics: Arc<PollerMetrics>,
    ) -> Self {
        Self {
            market,
            reader,
            stores,
            settings,
            metrics,
            resolved: None,
            state: PollerState::Idle,
        }
    }

    pub fn market(&self) -> &MarketId {
        &self.market.name
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    pub fn metrics(&self) -> &Arc<PollerMetrics> {
        &self.metrics
    }

    /// Locate the event queue and token decimals; cached after success.
    async fn resolve(&mut self) -> Result<ResolvedMarket, PollError> {
        if let Some(resolved) = self.resolved {
            return Ok(resolved);
        }

        let bytes = self.reader.get_account_bytes(&self.market.address).await?;
        let state = MarketState::decode(&bytes, &self.market.address)?;

        let decimals = match self.market.decimals()? {
            Some(decimals) => decimals,
            None => {
                let base = self.reader.get_account_bytes(&state.base_mint).await?;
                let quote = self.reader.get_account_bytes(&state.quote_mint).await?;
                TokenDecimals::new(decode_mint_decimals(&base)?, decode_mint_decimals(&quote)?)?
            }
        };

        info!(
            event_queue = %state.event_queue,
            base_decimals = decimals.base,
            quote_decimals = decimals.quote,
            "Market resolved"
        );
        let resolved = ResolvedMarket {
            event_queue: state.event_queue,
            decimals,
        };
        self.resolved = Some(resolved);
        Ok(resolved)
    }

    /// One fetch, decode, extract, persist, commit pass.
    ///
    /// Ends in `Sleeping` whether the pass succeeded or not.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, PollError> {
        let result = self.cycle().await;
        self.state = PollerState::Sleeping;
        result
    }

    async fn cycle(&mut self) -> Result<CycleReport, PollError> {
        let name = self.market.name.clone();

        self.state = PollerState::Idle;
        let cursor = self.stores.cursor.load(&name).await?;

        self.state = PollerState::Fetching;
        let resolved = self.resolve().await?;
        let bytes = self.reader.get_account_bytes(&resolved.event_queue).await?;

        self.state = PollerState::Decoding;
        let recent = decode_recent_events(&bytes, cursor)?;
        let trades = extract(&recent.events, resolved.decimals);

        if recent.reset {
            warn!(
                last_seq_num = ?cursor,
                seq_num = recent.header.seq_num,
                "Event queue sequence went backwards, restarting cursor"
            );
        }
        if recent.gap_detected() {
            warn!(
                missed = recent.missed,
                last_seq_num = ?cursor,
                seq_num = recent.header.seq_num,
                "Events overwritten before they could be read"
            );
        }

        self.state = PollerState::Persisting;
        for trade in &trades {
            self.stores.trades.append(&name, trade).await?;
            self.stores.candles.record_trade(&name, trade).await?;
        }
        let next = recent.next_cursor();
        if cursor != Some(next) {
            self.stores.cursor.commit(&name, next).await?;
        }

        self.metrics.record_cycle(trades.len(), recent.missed, recent.reset);
        if !trades.is_empty() {
            info!(trades = trades.len(), seq_num = next, "Trades stored");
        }

        Ok(CycleReport {
            trades: trades.len(),
            events: recent.events.len(),
            missed: recent.missed,
            reset: recent.reset,
            seq_num: next,
        })
    }

    fn log_cycle(&self, result: &Result<CycleReport, PollError>) {
        match result {
            Ok(report) => debug!(
                events = report.events,
                trades = report.trades,
                seq_num = report.seq_num,
                "Cycle complete"
            ),
            Err(e) if e.is_not_found() => warn!(
                error = %e,
                "Account not found; the market address may be stale or on another cluster"
            ),
            Err(e) => error!(kind = e.kind(), error = %e, "Cycle failed"),
        }
        if let Err(e) = result {
            self.metrics.record_failure(e.is_not_found());
        }
    }

    /// Poll until `shutdown` flips to true (or its sender is dropped).
    ///
    /// An in-flight cycle or sleep is abandoned on shutdown.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = self.settings.interval.as_millis() as u64, "Poller started");
        loop {
            if *shutdown.borrow() {
                break;
            }

            let result = tokio::select! {
                result = self.run_cycle() => result,
                _ = shutdown.changed() => break,
            };
            self.log_cycle(&result);

            tokio::select! {
                _ = tokio::time::sleep(self.settings.interval) => {}
                _ = shutdown.changed() => break,
            }
        }
        info!(metrics = ?self.metrics.snapshot(), "Poller stopped");
    }
}

/// A running poller task.
pub struct PollerHandle {
    pub market: MarketId,
    pub metrics: Arc<PollerMetrics>,
    pub task: JoinHandle<()>,
}

/// Spawn one independent poller task per market.
pub fn spawn_pollers<F>(
    markets: &[MarketConfig],
    reader_for: F,
    stores: &FeedStores,
    settings: &PollerSettings,
    shutdown: &watch::Receiver<bool>,
) -> Vec<PollerHandle>
where
    F: Fn(&MarketConfig) -> Arc<dyn AccountReader>,
{
    markets
        .iter()
        .map(|market| {
            let metrics = Arc::new(PollerMetrics::new());
            let poller = MarketPoller::new(
                market.clone(),
                reader_for(market),
                stores.clone(),
                settings.clone(),
                metrics.clone(),
            );
            let span = info_span!("poller", market = %market.name, program = %market.program_id);
            let task = tokio::spawn(poller.run(shutdown.clone()).instrument(span));
            PollerHandle {
                market: market.name.clone(),
                metrics,
                task,
            }
        })
        .collect()
}
