//! Event Queue Decoder
//!
//! Turns the raw bytes of a market's event queue account plus the last
//! consumed sequence number into the ordered list of events not seen yet.
//!
//! # Binary Format
//! ```text
//! [b"serum": 5]
//! [account_flags: u64]
//! [head:    u64]   physical index of the oldest unconsumed slot
//! [count:   u64]   number of unconsumed slots
//! [seq_num: u64]   events appended so far in this epoch
//! [slot; capacity]  88 bytes each
//! [slop: < 88]      unused remainder of the allocation
//! [b"padding": 7]
//! ```
//!
//! # Slot Format
//! ```text
//! [flags: u8][open_orders_slot: u8][fee_tier: u8][pad: 5]
//! [native_qty_released: u64][native_qty_paid: u64][native_fee_or_rebate: u64]
//! [order_id: u128][owner: 32][client_order_id: u64]
//! ```
//!
//! # Sequence numbers
//! The k-th event appended in an epoch has sequence number k, so the newest
//! slot carries `seq_num` and a cursor equal to `seq_num` means "caught up".
//! Cranking only advances `head`; slot contents stay in place until the
//! ring wraps over them, so the last `min(seq_num, capacity)` events are
//! always readable even after they were consumed on chain.

use types::ids::Address;

use crate::layout::{
    check_head_padding, check_tail_padding, read_u128, read_u64, read_u8, AccountFlags,
    AccountKind, DecodeError, HEAD_PADDING, TAIL_PADDING,
};

/// Header bytes, including the leading marker.
pub const HEADER_LEN: usize = 37;
/// Bytes per ring slot.
pub const EVENT_LEN: usize = 88;

const FLAGS_OFFSET: usize = 5;
const HEAD_OFFSET: usize = 13;
const COUNT_OFFSET: usize = 21;
const SEQ_NUM_OFFSET: usize = 29;

// ── Header ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventQueueHeader {
    pub flags: AccountFlags,
    pub head: u64,
    pub count: u64,
    pub seq_num: u64,
}

impl EventQueueHeader {
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[..FLAGS_OFFSET].copy_from_slice(HEAD_PADDING);
        buf[FLAGS_OFFSET..HEAD_OFFSET].copy_from_slice(&self.flags.bits().to_le_bytes());
        buf[HEAD_OFFSET..COUNT_OFFSET].copy_from_slice(&self.head.to_le_bytes());
        buf[COUNT_OFFSET..SEQ_NUM_OFFSET].copy_from_slice(&self.count.to_le_bytes());
        buf[SEQ_NUM_OFFSET..HEADER_LEN].copy_from_slice(&self.seq_num.to_le_bytes());
        buf
    }
}

// ── Events ──────────────────────────────────────────────────────────

/// Per-event flag bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventFlags {
    pub fill: bool,
    pub out: bool,
    /// Order was a bid (buy); ask otherwise
    pub bid: bool,
    pub maker: bool,
    pub release_funds: bool,
}

impl EventFlags {
    const FILL: u8 = 0x01;
    const OUT: u8 = 0x02;
    const BID: u8 = 0x04;
    const MAKER: u8 = 0x08;
    const RELEASE_FUNDS: u8 = 0x10;
    const DEFINED: u8 = 0x1f;

    /// Decode flag bits. An event is exactly one of Fill or Out.
    pub fn from_bits(bits: u8, seq_num: u64) -> Result<Self, DecodeError> {
        let flags = Self {
            fill: bits & Self::FILL != 0,
            out: bits & Self::OUT != 0,
            bid: bits & Self::BID != 0,
            maker: bits & Self::MAKER != 0,
            release_funds: bits & Self::RELEASE_FUNDS != 0,
        };
        if bits & !Self::DEFINED != 0 || flags.fill == flags.out {
            return Err(DecodeError::InvalidEventFlags { flags: bits, seq_num });
        }
        Ok(flags)
    }

    pub fn bits(&self) -> u8 {
        let mut bits = 0;
        if self.fill {
            bits |= Self::FILL;
        }
        if self.out {
            bits |= Self::OUT;
        }
        if self.bid {
            bits |= Self::BID;
        }
        if self.maker {
            bits |= Self::MAKER;
        }
        if self.release_funds {
            bits |= Self::RELEASE_FUNDS;
        }
        bits
    }

    /// Fill of the order that crossed the spread.
    pub fn is_taker_fill(&self) -> bool {
        self.fill && !self.maker
    }
}

/// One decoded ring slot. Amounts are in native (smallest) token units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEvent {
    pub flags: EventFlags,
    pub open_orders_slot: u8,
    pub fee_tier: u8,
    pub native_qty_released: u64,
    pub native_qty_paid: u64,
    pub native_fee_or_rebate: u64,
    pub order_id: u128,
    pub owner: Address,
    pub client_order_id: u64,
}

impl QueueEvent {
    fn decode(slot: &[u8], seq_num: u64) -> Result<Self, DecodeError> {
        let flags = EventFlags::from_bits(read_u8(slot, 0)?, seq_num)?;
        let owner = slot
            .get(48..80)
            .and_then(Address::from_slice)
            .ok_or(DecodeError::TooShort {
                len: slot.len(),
                min: 80,
            })?;
        Ok(Self {
            flags,
            open_orders_slot: read_u8(slot, 1)?,
            fee_tier: read_u8(slot, 2)?,
            native_qty_released: read_u64(slot, 8)?,
            native_qty_paid: read_u64(slot, 16)?,
            native_fee_or_rebate: read_u64(slot, 24)?,
            order_id: read_u128(slot, 32)?,
            owner,
            client_order_id: read_u64(slot, 80)?,
        })
    }

    pub fn encode(&self) -> [u8; EVENT_LEN] {
        let mut buf = [0u8; EVENT_LEN];
        buf[0] = self.flags.bits();
        buf[1] = self.open_orders_slot;
        buf[2] = self.fee_tier;
        buf[8..16].copy_from_slice(&self.native_qty_released.to_le_bytes());
        buf[16..24].copy_from_slice(&self.native_qty_paid.to_le_bytes());
        buf[24..32].copy_from_slice(&self.native_fee_or_rebate.to_le_bytes());
        buf[32..48].copy_from_slice(&self.order_id.to_le_bytes());
        buf[48..80].copy_from_slice(self.owner.as_bytes());
        buf[80..88].copy_from_slice(&self.client_order_id.to_le_bytes());
        buf
    }
}

/// A decoded event together with its absolute sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencedEvent {
    pub seq_num: u64,
    pub event: QueueEvent,
}

// ── Decoding ────────────────────────────────────────────────────────

/// Result of decoding the queue relative to a cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentEvents {
    pub header: EventQueueHeader,
    pub capacity: u64,
    /// New events, ascending by sequence number.
    pub events: Vec<SequencedEvent>,
    /// Events appended since the cursor that were overwritten before this read.
    pub missed: u64,
    /// The queue's sequence number fell below the cursor: the account was
    /// re-created. No events are returned; the caller restarts its cursor
    /// at `header.seq_num`.
    pub reset: bool,
}

impl RecentEvents {
    pub fn gap_detected(&self) -> bool {
        self.missed > 0
    }

    /// Cursor value to commit once these events are persisted.
    pub fn next_cursor(&self) -> u64 {
        self.header.seq_num
    }
}

/// Validate the account framing and decode its header.
///
/// Returns the header and the ring capacity in slots.
pub fn decode_header(data: &[u8]) -> Result<(EventQueueHeader, u64), DecodeError> {
    let min = HEADER_LEN + EVENT_LEN + TAIL_PADDING.len();
    if data.len() < min {
        return Err(DecodeError::TooShort {
            len: data.len(),
            min,
        });
    }
    check_head_padding(data)?;
    check_tail_padding(data)?;

    let flags = AccountFlags::from_bits(read_u64(data, FLAGS_OFFSET)?)?;
    flags.require(AccountKind::EventQueue)?;

    // Trailing bytes short of a whole slot are slop the program never writes.
    let capacity = ((data.len() - HEADER_LEN - TAIL_PADDING.len()) / EVENT_LEN) as u64;
    let header = EventQueueHeader {
        flags,
        head: read_u64(data, HEAD_OFFSET)?,
        count: read_u64(data, COUNT_OFFSET)?,
        seq_num: read_u64(data, SEQ_NUM_OFFSET)?,
    };

    if header.head >= capacity {
        return Err(DecodeError::HeaderOutOfRange {
            field: "head",
            value: header.head,
            capacity,
        });
    }
    if header.count > capacity || header.count > header.seq_num {
        return Err(DecodeError::HeaderOutOfRange {
            field: "count",
            value: header.count,
            capacity,
        });
    }
    Ok((header, capacity))
}

/// Decode the events appended after `last_seq_num`.
///
/// With no cursor every retained event is returned. If more events were
/// appended than the ring retains, the recoverable suffix is returned and
/// `missed` counts the overwritten ones.
pub fn decode_recent_events(
    data: &[u8],
    last_seq_num: Option<u64>,
) -> Result<RecentEvents, DecodeError> {
    let (header, capacity) = decode_header(data)?;
    let retained = header.seq_num.min(capacity);

    let (wanted, missed, reset) = match last_seq_num {
        None => (retained, 0, false),
        Some(last) if header.seq_num < last => (0, 0, true),
        Some(last) => {
            let unseen = header.seq_num - last;
            if unseen > retained {
                (retained, unseen - retained, false)
            } else {
                (unseen, 0, false)
            }
        }
    };

    // Slot holding event `seq_num`; `head + count` is the next write position.
    let newest = (header.head + header.count + capacity - 1) % capacity;

    let mut events = Vec::with_capacity(wanted as usize);
    for back in (0..wanted).rev() {
        let slot = ((newest + capacity - back) % capacity) as usize;
        let seq_num = header.seq_num.wrapping_sub(back);
        let offset = HEADER_LEN + slot * EVENT_LEN;
        let event = QueueEvent::decode(&data[offset..offset + EVENT_LEN], seq_num)?;
        events.push(SequencedEvent { seq_num, event });
    }

    Ok(RecentEvents {
        header,
        capacity,
        events,
        missed,
        reset,
    })
}

/// Serialize a queue account from a header and its full slot array.
pub fn encode_event_queue(header: &EventQueueHeader, slots: &[QueueEvent]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + slots.len() * EVENT_LEN + TAIL_PADDING.len());
    buf.extend_from_slice(&header.encode());
    for slot in slots {
        buf.extend_from_slice(&slot.encode());
    }
    buf.extend_from_slice(TAIL_PADDING);
    buf
}

/// Ring-buffer simulator producing queue accounts for tests.
#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub(crate) fn blank_event() -> QueueEvent {
        QueueEvent {
            flags: EventFlags {
                out: true,
                ..EventFlags::default()
            },
            open_orders_slot: 0,
            fee_tier: 0,
            native_qty_released: 0,
            native_qty_paid: 0,
            native_fee_or_rebate: 0,
            order_id: 0,
            owner: Address::new([7; 32]),
            client_order_id: 0,
        }
    }

    /// Marker event whose `client_order_id` equals its sequence number.
    pub(crate) fn tagged(seq_num: u64) -> QueueEvent {
        QueueEvent {
            client_order_id: seq_num,
            ..blank_event()
        }
    }

    pub(crate) struct RingQueue {
        slots: Vec<QueueEvent>,
        head: u64,
        count: u64,
        seq_num: u64,
    }

    impl RingQueue {
        pub(crate) fn new(capacity: usize) -> Self {
            Self {
                slots: vec![blank_event(); capacity],
                head: 0,
                count: 0,
                seq_num: 0,
            }
        }

        fn capacity(&self) -> u64 {
            self.slots.len() as u64
        }

        /// Append like the on-chain program: a full ring drops its oldest
        /// unconsumed event.
        pub(crate) fn push(&mut self, event: QueueEvent) {
            let cap = self.capacity();
            let slot = ((self.head + self.count) % cap) as usize;
            self.slots[slot] = event;
            if self.count == cap {
                self.head = (self.head + 1) % cap;
            } else {
                self.count += 1;
            }
            self.seq_num += 1;
        }

        /// Crank: consume up to `n` events from the head.
        pub(crate) fn consume(&mut self, n: u64) {
            let n = n.min(self.count);
            self.head = (self.head + n) % self.capacity();
            self.count -= n;
        }

        pub(crate) fn seq_num(&self) -> u64 {
            self.seq_num
        }

        pub(crate) fn to_bytes(&self) -> Vec<u8> {
            let header = EventQueueHeader {
                flags: AccountFlags::initialized(AccountKind::EventQueue),
                head: self.head,
                count: self.count,
                seq_num: self.seq_num,
            };
            encode_event_queue(&header, &self.slots)
        }
    }
}
