//! End-to-end: queue bytes in, candles and trade log out, over SQLite.

use std::sync::Arc;

use ingestor::chain::InMemoryAccounts;
use ingestor::event_queue::{encode_event_queue, EventFlags, EventQueueHeader, QueueEvent};
use ingestor::layout::{AccountFlags, AccountKind};
use ingestor::market_state::MarketState;
use ingestor::{MarketPoller, PollerMetrics, PollerSettings};
use market_data::FeedStores;
use persistence::{PoolSettings, SqliteBackend, StorageBackend};
use rust_decimal::Decimal;
use types::candle::Resolution;
use types::ids::{Address, MarketId};
use types::market::MarketConfig;
use types::trade::TradeSide;

const MARKET: Address = Address::new([11; 32]);
const QUEUE: Address = Address::new([12; 32]);

fn market_config() -> MarketConfig {
    MarketConfig {
        name: MarketId::new("SOL/USDC"),
        address: MARKET,
        program_id: Address::new([13; 32]),
        cluster_url: None,
        base_decimals: Some(9),
        quote_decimals: Some(6),
    }
}

fn market_account() -> Vec<u8> {
    MarketState {
        own_address: MARKET,
        base_mint: Address::new([14; 32]),
        quote_mint: Address::new([15; 32]),
        event_queue: QUEUE,
        bids: Address::new([16; 32]),
        asks: Address::new([17; 32]),
        base_lot_size: 100_000_000,
        quote_lot_size: 100,
    }
    .encode()
}

fn event(flags: EventFlags, released: u64, paid: u64) -> QueueEvent {
    QueueEvent {
        flags,
        open_orders_slot: 0,
        fee_tier: 0,
        native_qty_released: released,
        native_qty_paid: paid,
        native_fee_or_rebate: 0,
        order_id: 1,
        owner: Address::new([18; 32]),
        client_order_id: 0,
    }
}

/// A matched trade: the taker's fill followed by the maker's.
fn matched(price: u64, size: u64, taker_bid: bool) -> [QueueEvent; 2] {
    let base = size * 1_000_000_000;
    let quote = price * size * 1_000_000;
    let taker = EventFlags {
        fill: true,
        bid: taker_bid,
        ..EventFlags::default()
    };
    let maker = EventFlags {
        fill: true,
        bid: !taker_bid,
        maker: true,
        ..EventFlags::default()
    };
    if taker_bid {
        [event(taker, base, quote), event(maker, quote, base)]
    } else {
        [event(taker, quote, base), event(maker, base, quote)]
    }
}

/// Minimal ring: appends wrap around `capacity` slots.
struct Ring {
    slots: Vec<QueueEvent>,
    seq_num: u64,
}

impl Ring {
    fn new(capacity: usize) -> Self {
        let out = EventFlags {
            out: true,
            ..EventFlags::default()
        };
        Self {
            slots: vec![event(out, 0, 0); capacity],
            seq_num: 0,
        }
    }

    fn push_all(&mut self, events: impl IntoIterator<Item = QueueEvent>) {
        for e in events {
            let cap = self.slots.len() as u64;
            self.slots[(self.seq_num % cap) as usize] = e;
            self.seq_num += 1;
        }
    }

    /// Fully cranked queue: nothing unconsumed.
    fn to_bytes(&self) -> Vec<u8> {
        let header = EventQueueHeader {
            flags: AccountFlags::initialized(AccountKind::EventQueue),
            head: self.seq_num % self.slots.len() as u64,
            count: 0,
            seq_num: self.seq_num,
        };
        encode_event_queue(&header, &self.slots)
    }
}

#[tokio::test]
async fn test_queue_to_candles_over_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let backend: Arc<dyn StorageBackend> = Arc::new(
        SqliteBackend::open(&dir.path().join("feed.db"), PoolSettings::default()).unwrap(),
    );
    let stores = FeedStores::new(backend, vec![Resolution::M1, Resolution::H1], 5);

    let accounts = Arc::new(InMemoryAccounts::new());
    accounts.set(MARKET, market_account()).await;

    let mut ring = Ring::new(6);
    ring.push_all(matched(10, 2, true));
    ring.push_all(matched(12, 1, false));
    accounts.set(QUEUE, ring.to_bytes()).await;

    let metrics = Arc::new(PollerMetrics::new());
    let mut poller = MarketPoller::new(
        market_config(),
        accounts.clone(),
        stores.clone(),
        PollerSettings::default(),
        metrics.clone(),
    );
    let report = poller.run_cycle().await.unwrap();
    assert_eq!(report.events, 4);
    assert_eq!(report.trades, 2);

    // Wrap the 6-slot ring: 6 more events, all still inside the window.
    ring.push_all(matched(11, 3, true));
    ring.push_all(matched(9, 1, false));
    ring.push_all(matched(13, 1, true));
    accounts.set(QUEUE, ring.to_bytes()).await;
    let report = poller.run_cycle().await.unwrap();
    assert_eq!(report.events, 6);
    assert_eq!(report.trades, 3);
    assert_eq!(report.missed, 0);
    assert_eq!(report.seq_num, 10);

    let market = MarketId::new("SOL/USDC");
    assert_eq!(stores.cursor.load(&market).await.unwrap(), Some(10));

    let recent = stores.trades.load_recent(&market).await.unwrap();
    let prices: Vec<Decimal> = recent.iter().map(|t| t.price).collect();
    assert_eq!(
        prices,
        vec![13, 9, 11, 12, 10].into_iter().map(Decimal::from).collect::<Vec<_>>()
    );
    assert_eq!(recent[1].side, TradeSide::Sell);
    assert_eq!(recent[0].side, TradeSide::Buy);

    let candles = stores
        .candles
        .query(&market, Resolution::H1, 0, i64::MAX / 2)
        .await
        .unwrap();
    let volume: Decimal = candles.iter().map(|c| c.volume).sum();
    assert_eq!(volume, Decimal::from(8));
    let high = candles.iter().map(|c| c.high).max().unwrap();
    let low = candles.iter().map(|c| c.low).min().unwrap();
    assert_eq!(high, Decimal::from(13));
    assert_eq!(low, Decimal::from(9));

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.cycles_completed, 2);
    assert_eq!(snapshot.trades_stored, 5);
}

#[tokio::test]
async fn test_restart_resumes_from_committed_cursor() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feed.db");
    let accounts = Arc::new(InMemoryAccounts::new());
    accounts.set(MARKET, market_account()).await;

    let mut ring = Ring::new(8);
    ring.push_all(matched(10, 1, true));
    accounts.set(QUEUE, ring.to_bytes()).await;

    {
        let backend: Arc<dyn StorageBackend> =
            Arc::new(SqliteBackend::open(&path, PoolSettings::default()).unwrap());
        let stores = FeedStores::new(backend, vec![Resolution::M1], 100);
        let mut poller = MarketPoller::new(
            market_config(),
            accounts.clone(),
            stores,
            PollerSettings::default(),
            Arc::new(PollerMetrics::new()),
        );
        assert_eq!(poller.run_cycle().await.unwrap().trades, 1);
    }

    ring.push_all(matched(20, 1, true));
    accounts.set(QUEUE, ring.to_bytes()).await;

    let backend: Arc<dyn StorageBackend> =
        Arc::new(SqliteBackend::open(&path, PoolSettings::default()).unwrap());
    let stores = FeedStores::new(backend, vec![Resolution::M1], 100);
    let mut poller = MarketPoller::new(
        market_config(),
        accounts,
        stores.clone(),
        PollerSettings::default(),
        Arc::new(PollerMetrics::new()),
    );
    let report = poller.run_cycle().await.unwrap();
    assert_eq!(report.events, 2);
    assert_eq!(report.trades, 1);

    let recent = stores
        .trades
        .load_recent(&MarketId::new("SOL/USDC"))
        .await
        .unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].price, Decimal::from(20));
}
