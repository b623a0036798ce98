//! Account layout primitives shared by the queue, market and mint decoders
//!
//! Raw flag words are decoded exactly once, here, into explicit structs.
//! Nothing downstream looks at raw bits.

use thiserror::Error;

/// Leading marker of every DEX-owned account.
pub const HEAD_PADDING: &[u8; 5] = b"serum";
/// Trailing marker of every DEX-owned account.
pub const TAIL_PADDING: &[u8; 7] = b"padding";

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("account too short: {len} bytes, need at least {min}")]
    TooShort { len: usize, min: usize },

    #[error("missing {which} padding marker")]
    BadPadding { which: &'static str },

    #[error("undefined account flag bits in {flags:#x}")]
    UnknownAccountFlags { flags: u64 },

    #[error("account flags {flags:#x} do not describe an initialized {expected}")]
    WrongAccountKind { flags: u64, expected: &'static str },

    #[error("header {field}={value} out of range (capacity {capacity})")]
    HeaderOutOfRange { field: &'static str, value: u64, capacity: u64 },

    #[error("invalid event flags {flags:#04x} at seq {seq_num}")]
    InvalidEventFlags { flags: u8, seq_num: u64 },

    #[error("account {field} mismatch: expected {expected}, found {found}")]
    AddressMismatch {
        field: &'static str,
        expected: String,
        found: String,
    },

    #[error("mint account is not initialized")]
    UninitializedMint,
}

// ── Byte readers ────────────────────────────────────────────────────

pub(crate) fn read_u64(data: &[u8], offset: usize) -> Result<u64, DecodeError> {
    data.get(offset..offset + 8)
        .and_then(|b| b.try_into().ok())
        .map(u64::from_le_bytes)
        .ok_or(DecodeError::TooShort {
            len: data.len(),
            min: offset + 8,
        })
}

pub(crate) fn read_u128(data: &[u8], offset: usize) -> Result<u128, DecodeError> {
    data.get(offset..offset + 16)
        .and_then(|b| b.try_into().ok())
        .map(u128::from_le_bytes)
        .ok_or(DecodeError::TooShort {
            len: data.len(),
            min: offset + 16,
        })
}

pub(crate) fn read_u8(data: &[u8], offset: usize) -> Result<u8, DecodeError> {
    data.get(offset).copied().ok_or(DecodeError::TooShort {
        len: data.len(),
        min: offset + 1,
    })
}

/// Check the leading `serum` marker.
pub(crate) fn check_head_padding(data: &[u8]) -> Result<(), DecodeError> {
    if data.starts_with(HEAD_PADDING) {
        Ok(())
    } else {
        Err(DecodeError::BadPadding { which: "head" })
    }
}

/// Check the trailing `padding` marker.
pub(crate) fn check_tail_padding(data: &[u8]) -> Result<(), DecodeError> {
    if data.ends_with(TAIL_PADDING) {
        Ok(())
    } else {
        Err(DecodeError::BadPadding { which: "tail" })
    }
}

// ── Account flags ───────────────────────────────────────────────────

/// Kind and state bits of a DEX account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountFlags {
    pub initialized: bool,
    pub market: bool,
    pub open_orders: bool,
    pub request_queue: bool,
    pub event_queue: bool,
    pub bids: bool,
    pub asks: bool,
    pub disabled: bool,
    pub closed: bool,
    pub permissioned: bool,
    pub crank_authority: bool,
}

/// Account kinds, one of which must be set on an initialized account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    Market,
    EventQueue,
}

impl AccountKind {
    fn label(&self) -> &'static str {
        match self {
            AccountKind::Market => "market",
            AccountKind::EventQueue => "event queue",
        }
    }
}

impl AccountFlags {
    const INITIALIZED: u64 = 1 << 0;
    const MARKET: u64 = 1 << 1;
    const OPEN_ORDERS: u64 = 1 << 2;
    const REQUEST_QUEUE: u64 = 1 << 3;
    const EVENT_QUEUE: u64 = 1 << 4;
    const BIDS: u64 = 1 << 5;
    const ASKS: u64 = 1 << 6;
    const DISABLED: u64 = 1 << 7;
    const CLOSED: u64 = 1 << 8;
    const PERMISSIONED: u64 = 1 << 9;
    const CRANK_AUTHORITY: u64 = 1 << 10;
    const DEFINED: u64 = (1 << 11) - 1;

    pub fn from_bits(bits: u64) -> Result<Self, DecodeError> {
        if bits & !Self::DEFINED != 0 {
            return Err(DecodeError::UnknownAccountFlags { flags: bits });
        }
        Ok(Self {
            initialized: bits & Self::INITIALIZED != 0,
            market: bits & Self::MARKET != 0,
            open_orders: bits & Self::OPEN_ORDERS != 0,
            request_queue: bits & Self::REQUEST_QUEUE != 0,
            event_queue: bits & Self::EVENT_QUEUE != 0,
            bids: bits & Self::BIDS != 0,
            asks: bits & Self::ASKS != 0,
            disabled: bits & Self::DISABLED != 0,
            closed: bits & Self::CLOSED != 0,
            permissioned: bits & Self::PERMISSIONED != 0,
            crank_authority: bits & Self::CRANK_AUTHORITY != 0,
        })
    }

    pub fn bits(&self) -> u64 {
        [
            (self.initialized, Self::INITIALIZED),
            (self.market, Self::MARKET),
            (self.open_orders, Self::OPEN_ORDERS),
            (self.request_queue, Self::REQUEST_QUEUE),
            (self.event_queue, Self::EVENT_QUEUE),
            (self.bids, Self::BIDS),
            (self.asks, Self::ASKS),
            (self.disabled, Self::DISABLED),
            (self.closed, Self::CLOSED),
            (self.permissioned, Self::PERMISSIONED),
            (self.crank_authority, Self::CRANK_AUTHORITY),
        ]
        .iter()
        .filter(|(set, _)| *set)
        .fold(0, |acc, (_, bit)| acc | bit)
    }

    /// Flags of a freshly initialized account of `kind`.
    pub fn initialized(kind: AccountKind) -> Self {
        Self {
            initialized: true,
            market: kind == AccountKind::Market,
            event_queue: kind == AccountKind::EventQueue,
            ..Self::default()
        }
    }

    /// Require an initialized account whose only kind bit is `kind`.
    pub fn require(&self, kind: AccountKind) -> Result<(), DecodeError> {
        let kinds = [
            (self.market, AccountKind::Market == kind),
            (self.event_queue, AccountKind::EventQueue == kind),
            (self.open_orders, false),
            (self.request_queue, false),
            (self.bids, false),
            (self.asks, false),
        ];
        let kind_ok = kinds.iter().all(|(set, wanted)| set == wanted);
        if self.initialized && kind_ok {
            Ok(())
        } else {
            Err(DecodeError::WrongAccountKind {
                flags: self.bits(),
                expected: kind.label(),
            })
        }
    }
}
