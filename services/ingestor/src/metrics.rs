//! Per-market poller counters
//!
//! Plain atomics; the process logs a snapshot at shutdown and tests read
//! them to observe what a poller did.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct PollerMetrics {
    pub cycles_completed: AtomicU64,
    pub cycles_failed: AtomicU64,
    pub not_found: AtomicU64,
    pub trades_stored: AtomicU64,
    pub events_missed: AtomicU64,
    pub resets: AtomicU64,
}

/// Point-in-time copy of `PollerMetrics`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub not_found: u64,
    pub trades_stored: u64,
    pub events_missed: u64,
    pub resets: u64,
}

impl PollerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cycle(&self, trades: usize, missed: u64, reset: bool) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        self.trades_stored.fetch_add(trades as u64, Ordering::Relaxed);
        self.events_missed.fetch_add(missed, Ordering::Relaxed);
        if reset {
            self.resets.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_failure(&self, not_found: bool) {
        self.cycles_failed.fetch_add(1, Ordering::Relaxed);
        if not_found {
            self.not_found.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            trades_stored: self.trades_stored.load(Ordering::Relaxed),
            events_missed: self.events_missed.load(Ordering::Relaxed),
            resets: self.resets.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSnapshot {
    /// Export as name/value pairs for log output.
    pub fn export(&self) -> BTreeMap<&'static str, u64> {
        BTreeMap::from([
            ("cycles_completed", self.cycles_completed),
            ("cycles_failed", self.cycles_failed),
            ("not_found", self.not_found),
            ("trades_stored", self.trades_stored),
            ("events_missed", self.events_missed),
            ("resets", self.resets),
        ])
    }
}
