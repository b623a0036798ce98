//! Market and mint account decoding
//!
//! The poller needs three things from the chain before it can read a
//! queue: the event queue's address, and the decimals of both mints.
//! They are fixed for the lifetime of a market, so callers decode them
//! once and cache the result.

use types::ids::Address;

use crate::layout::{
    check_head_padding, read_u64, read_u8, AccountFlags, AccountKind, DecodeError, HEAD_PADDING,
};

const FLAGS_OFFSET: usize = 5;
const OWN_ADDRESS_OFFSET: usize = 13;
const BASE_MINT_OFFSET: usize = 53;
const QUOTE_MINT_OFFSET: usize = 85;
const EVENT_QUEUE_OFFSET: usize = 253;
const BIDS_OFFSET: usize = 285;
const ASKS_OFFSET: usize = 317;
const BASE_LOT_SIZE_OFFSET: usize = 349;
const QUOTE_LOT_SIZE_OFFSET: usize = 357;

/// Smallest market account that holds every field read here.
pub const MARKET_MIN_LEN: usize = 388;

/// SPL mint accounts are exactly this long; anything shorter is truncated.
pub const MINT_LEN: usize = 82;
const MINT_DECIMALS_OFFSET: usize = 44;
const MINT_INITIALIZED_OFFSET: usize = 45;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketState {
    pub own_address: Address,
    pub base_mint: Address,
    pub quote_mint: Address,
    pub event_queue: Address,
    pub bids: Address,
    pub asks: Address,
    pub base_lot_size: u64,
    pub quote_lot_size: u64,
}

fn read_address(data: &[u8], offset: usize) -> Result<Address, DecodeError> {
    data.get(offset..offset + Address::LEN)
        .and_then(Address::from_slice)
        .ok_or(DecodeError::TooShort {
            len: data.len(),
            min: offset + Address::LEN,
        })
}

impl MarketState {
    /// Decode a market account and check it describes `expected`.
    pub fn decode(data: &[u8], expected: &Address) -> Result<Self, DecodeError> {
        if data.len() < MARKET_MIN_LEN {
            return Err(DecodeError::TooShort {
                len: data.len(),
                min: MARKET_MIN_LEN,
            });
        }
        check_head_padding(data)?;
        AccountFlags::from_bits(read_u64(data, FLAGS_OFFSET)?)?.require(AccountKind::Market)?;

        let own_address = read_address(data, OWN_ADDRESS_OFFSET)?;
        if own_address != *expected {
            return Err(DecodeError::AddressMismatch {
                field: "own_address",
                expected: expected.to_base58(),
                found: own_address.to_base58(),
            });
        }

        Ok(Self {
            own_address,
            base_mint: read_address(data, BASE_MINT_OFFSET)?,
            quote_mint: read_address(data, QUOTE_MINT_OFFSET)?,
            event_queue: read_address(data, EVENT_QUEUE_OFFSET)?,
            bids: read_address(data, BIDS_OFFSET)?,
            asks: read_address(data, ASKS_OFFSET)?,
            base_lot_size: read_u64(data, BASE_LOT_SIZE_OFFSET)?,
            quote_lot_size: read_u64(data, QUOTE_LOT_SIZE_OFFSET)?,
        })
    }

    /// Serialize into a minimal market account. Unknown regions are zeroed.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; MARKET_MIN_LEN];
        buf[..HEAD_PADDING.len()].copy_from_slice(HEAD_PADDING);
        let flags = AccountFlags::initialized(AccountKind::Market).bits();
        buf[FLAGS_OFFSET..OWN_ADDRESS_OFFSET].copy_from_slice(&flags.to_le_bytes());
        for (offset, address) in [
            (OWN_ADDRESS_OFFSET, &self.own_address),
            (BASE_MINT_OFFSET, &self.base_mint),
            (QUOTE_MINT_OFFSET, &self.quote_mint),
            (EVENT_QUEUE_OFFSET, &self.event_queue),
            (BIDS_OFFSET, &self.bids),
            (ASKS_OFFSET, &self.asks),
        ] {
            buf[offset..offset + Address::LEN].copy_from_slice(address.as_bytes());
        }
        buf[BASE_LOT_SIZE_OFFSET..BASE_LOT_SIZE_OFFSET + 8]
            .copy_from_slice(&self.base_lot_size.to_le_bytes());
        buf[QUOTE_LOT_SIZE_OFFSET..QUOTE_LOT_SIZE_OFFSET + 8]
            .copy_from_slice(&self.quote_lot_size.to_le_bytes());
        buf
    }
}

/// Decimals of an SPL token mint account.
pub fn decode_mint_decimals(data: &[u8]) -> Result<u8, DecodeError> {
    if data.len() < MINT_LEN {
        return Err(DecodeError::TooShort {
            len: data.len(),
            min: MINT_LEN,
        });
    }
    if read_u8(data, MINT_INITIALIZED_OFFSET)? != 1 {
        return Err(DecodeError::UninitializedMint);
    }
    read_u8(data, MINT_DECIMALS_OFFSET)
}

/// Serialize a minimal initialized mint with the given decimals.
pub fn encode_mint(decimals: u8) -> Vec<u8> {
    let mut buf = vec![0u8; MINT_LEN];
    buf[MINT_DECIMALS_OFFSET] = decimals;
    buf[MINT_INITIALIZED_OFFSET] = 1;
    buf
}
