//! Trade extraction
//!
//! Every match writes two fill events, one per side. Only the taker's is
//! kept so that one match yields exactly one trade.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::warn;
use types::numeric::TokenDecimals;
use types::trade::{Trade, TradeSide};

use crate::event_queue::{QueueEvent, SequencedEvent};

/// Convert decoded events into trades stamped with the current wall clock.
pub fn extract(events: &[SequencedEvent], decimals: TokenDecimals) -> Vec<Trade> {
    extract_trades(events, decimals, Utc::now().timestamp_millis())
}

/// Convert decoded events into trades observed at `observed_at` (Unix ms).
///
/// Fills whose price cannot be computed are dropped with a warning.
pub fn extract_trades(
    events: &[SequencedEvent],
    decimals: TokenDecimals,
    observed_at: i64,
) -> Vec<Trade> {
    events
        .iter()
        .filter(|e| e.event.flags.is_taker_fill())
        .filter_map(|e| match price_and_size(&e.event, decimals) {
            Some((price, size)) => {
                let side = if e.event.flags.bid {
                    TradeSide::Buy
                } else {
                    TradeSide::Sell
                };
                Some(Trade::new(price, side, size, observed_at))
            }
            None => {
                warn!(
                    seq_num = e.seq_num,
                    released = e.event.native_qty_released,
                    paid = e.event.native_qty_paid,
                    fee = e.event.native_fee_or_rebate,
                    "Skipping fill with no computable price"
                );
                None
            }
        })
        .collect()
}

fn price_and_size(event: &QueueEvent, decimals: TokenDecimals) -> Option<(Decimal, Decimal)> {
    let base = decimals.base_multiplier();
    let quote = decimals.quote_multiplier();
    let released = Decimal::from(event.native_qty_released);
    let paid = Decimal::from(event.native_qty_paid);
    let fee = Decimal::from(event.native_fee_or_rebate);

    // A bid taker pays quote and receives base; an ask taker the reverse.
    let (quote_native, base_native) = if event.flags.bid {
        (paid.checked_sub(fee)?, released)
    } else {
        (released.checked_add(fee)?, paid)
    };

    let denominator = quote.checked_mul(base_native)?;
    if denominator.is_zero() {
        return None;
    }
    let price = quote_native.checked_mul(base)?.checked_div(denominator)?;
    if price <= Decimal::ZERO {
        return None;
    }
    let size = base_native.checked_div(base)?;
    Some((price.normalize(), size.normalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_queue::{EventFlags, QueueEvent};
    use types::ids::Address;

    const OBSERVED: i64 = 1_700_000_000_000;

    fn sol_usdc() -> TokenDecimals {
        TokenDecimals::new(9, 6).unwrap()
    }

    fn fill(seq_num: u64, bid: bool, maker: bool, released: u64, paid: u64, fee: u64) -> SequencedEvent {
        SequencedEvent {
            seq_num,
            event: QueueEvent {
                flags: EventFlags {
                    fill: true,
                    bid,
                    maker,
                    ..EventFlags::default()
                },
                open_orders_slot: 0,
                fee_tier: 0,
                native_qty_released: released,
                native_qty_paid: paid,
                native_fee_or_rebate: fee,
                order_id: u128::from(seq_num),
                owner: Address::new([1; 32]),
                client_order_id: 0,
            },
        }
    }

    fn out(seq_num: u64) -> SequencedEvent {
        let mut event = fill(seq_num, true, false, 0, 0, 0);
        event.event.flags = EventFlags {
            out: true,
            ..EventFlags::default()
        };
        event
    }

    #[test]
    fn test_bid_taker_is_buy() {
        // Buys 2 SOL for 20 USDC plus a 0.05 USDC fee.
        let events = [fill(1, true, false, 2_000_000_000, 20_050_000, 50_000)];
        let trades = extract_trades(&events, sol_usdc(), OBSERVED);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].side, TradeSide::Buy);
        assert_eq!(trades[0].price, Decimal::from(10));
        assert_eq!(trades[0].size, Decimal::from(2));
        assert_eq!(trades[0].observed_at, OBSERVED);
    }

    #[test]
    fn test_ask_taker_is_sell() {
        // Sells 0.5 SOL for 5 USDC, of which 0.01 went to fees.
        let events = [fill(1, false, false, 4_990_000, 500_000_000, 10_000)];
        let trades = extract_trades(&events, sol_usdc(), OBSERVED);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].side, TradeSide::Sell);
        assert_eq!(trades[0].price, Decimal::from(10));
        assert_eq!(trades[0].size, Decimal::new(5, 1));
    }

    #[test]
    fn test_maker_fills_and_outs_are_dropped() {
        let events = [
            fill(1, false, true, 20_000_000, 2_000_000_000, 0),
            fill(2, true, false, 2_000_000_000, 20_000_000, 0),
            out(3),
        ];
        let trades = extract_trades(&events, sol_usdc(), OBSERVED);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].side, TradeSide::Buy);
    }

    #[test]
    fn test_per_market_scale() {
        // Same native amounts, different decimals, different UI values.
        let events = [fill(1, true, false, 1_000_000, 3_000_000, 0)];
        let six_six = extract_trades(&events, TokenDecimals::new(6, 6).unwrap(), OBSERVED);
        assert_eq!(six_six[0].price, Decimal::from(3));
        assert_eq!(six_six[0].size, Decimal::ONE);

        let eight_six = extract_trades(&events, TokenDecimals::new(8, 6).unwrap(), OBSERVED);
        assert_eq!(eight_six[0].price, Decimal::from(300));
        assert_eq!(eight_six[0].size, Decimal::new(1, 2));
    }

    #[test]
    fn test_uncomputable_fills_are_skipped() {
        let events = [
            fill(1, true, false, 0, 1_000, 0),
            fill(2, true, false, 1_000, 500, 500),
            fill(3, false, false, 1_000, 0, 0),
        ];
        assert!(extract_trades(&events, sol_usdc(), OBSERVED).is_empty());
    }

    #[test]
    fn test_preserves_event_order() {
        let events = [
            fill(1, true, false, 1_000_000_000, 10_000_000, 0),
            fill(2, false, false, 11_000_000, 1_000_000_000, 0),
            fill(3, true, false, 1_000_000_000, 12_000_000, 0),
        ];
        let prices: Vec<Decimal> = extract_trades(&events, sol_usdc(), OBSERVED)
            .iter()
            .map(|t| t.price)
            .collect();
        assert_eq!(prices, vec![Decimal::from(10), Decimal::from(11), Decimal::from(12)]);
    }

    #[test]
    fn test_wall_clock_stamp() {
        let before = Utc::now().timestamp_millis();
        let trades = extract(&[fill(1, true, false, 1_000_000_000, 10_000_000, 0)], sol_usdc());
        let after = Utc::now().timestamp_millis();
        assert!(trades[0].observed_at >= before && trades[0].observed_at <= after);
    }
}
