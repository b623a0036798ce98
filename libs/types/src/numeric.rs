//! Native fixed-point scaling
//!
//! On-chain amounts are integers in the smallest unit of each token
//! ("native" units). Every market carries its own base and quote scale;
//! nothing here assumes a global one.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::TypeError;

/// Largest decimal exponent whose power of ten fits in a `u64`.
pub const MAX_TOKEN_DECIMALS: u8 = 18;

/// Base/quote token decimals for one market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenDecimals {
    pub base: u8,
    pub quote: u8,
}

impl TokenDecimals {
    pub fn new(base: u8, quote: u8) -> Result<Self, TypeError> {
        for d in [base, quote] {
            if d > MAX_TOKEN_DECIMALS {
                return Err(TypeError::UnsupportedDecimals(d));
            }
        }
        Ok(Self { base, quote })
    }

    /// `10^base` as a decimal.
    pub fn base_multiplier(&self) -> Decimal {
        pow10(self.base)
    }

    /// `10^quote` as a decimal.
    pub fn quote_multiplier(&self) -> Decimal {
        pow10(self.quote)
    }
}

fn pow10(exp: u8) -> Decimal {
    Decimal::from(10u64.pow(u32::from(exp.min(MAX_TOKEN_DECIMALS))))
}
