use market_data::MarketDataError;
use thiserror::Error;
use types::errors::TypeError;

use crate::chain::ChainError;
use crate::layout::DecodeError;

/// Why a poll cycle was abandoned. The cursor is never advanced on error.
#[derive(Error, Debug)]
pub enum PollError {
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("storage failed: {0}")]
    Storage(#[from] MarketDataError),

    #[error("market configuration invalid: {0}")]
    Config(#[from] TypeError),
}

impl PollError {
    /// Short label for log fields and counters.
    pub fn kind(&self) -> &'static str {
        match self {
            PollError::Decode(_) => "decode",
            PollError::Chain(ChainError::NotFound(_)) => "not_found",
            PollError::Chain(_) => "chain",
            PollError::Storage(_) => "storage",
            PollError::Config(_) => "config",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PollError::Chain(ChainError::NotFound(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::Address;

    #[test]
    fn test_kind_labels() {
        let not_found = PollError::from(ChainError::NotFound(Address::new([0; 32])));
        assert_eq!(not_found.kind(), "not_found");
        assert!(not_found.is_not_found());

        let rpc = PollError::from(ChainError::Rpc {
            code: -1,
            message: "boom".to_string(),
        });
        assert_eq!(rpc.kind(), "chain");
        assert!(!rpc.is_not_found());

        let decode = PollError::from(DecodeError::UninitializedMint);
        assert_eq!(decode.kind(), "decode");

        let config = PollError::from(TypeError::UnsupportedDecimals(30));
        assert_eq!(config.kind(), "config");
    }
}
