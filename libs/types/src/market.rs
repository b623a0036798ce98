//! Static market configuration
//!
//! The registry is injected at startup from a JSON file; nothing in the
//! core derives or mutates it.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::TypeError;
use crate::ids::{Address, MarketId};
use crate::numeric::TokenDecimals;

/// One configured market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    pub name: MarketId,
    /// Market account address
    pub address: Address,
    /// Owning DEX program
    pub program_id: Address,
    /// Per-market RPC endpoint; falls back to the process default
    #[serde(default)]
    pub cluster_url: Option<String>,
    #[serde(default)]
    pub base_decimals: Option<u8>,
    #[serde(default)]
    pub quote_decimals: Option<u8>,
}

impl MarketConfig {
    /// Token decimals, when both sides are configured.
    pub fn decimals(&self) -> Result<Option<TokenDecimals>, TypeError> {
        match (self.base_decimals, self.quote_decimals) {
            (Some(base), Some(quote)) => TokenDecimals::new(base, quote).map(Some),
            _ => Ok(None),
        }
    }
}

/// The set of markets to poll, in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketRegistry {
    markets: Vec<MarketConfig>,
}

impl MarketRegistry {
    /// Build a registry, rejecting duplicate names or addresses.
    pub fn new(markets: Vec<MarketConfig>) -> Result<Self, TypeError> {
        let mut names = HashSet::new();
        let mut addresses = HashSet::new();
        for m in &markets {
            MarketId::try_new(m.name.as_str())?;
            m.decimals()?;
            if !names.insert(m.name.clone()) {
                return Err(TypeError::Registry(format!("duplicate market name {}", m.name)));
            }
            if !addresses.insert(m.address) {
                return Err(TypeError::Registry(format!(
                    "duplicate market address {}",
                    m.address
                )));
            }
        }
        Ok(Self { markets })
    }

    pub fn from_json(json: &str) -> Result<Self, TypeError> {
        let markets: Vec<MarketConfig> =
            serde_json::from_str(json).map_err(|e| TypeError::Registry(e.to_string()))?;
        Self::new(markets)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, TypeError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| TypeError::Registry(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn markets(&self) -> &[MarketConfig] {
        &self.markets
    }

    pub fn by_name(&self, name: &str) -> Option<&MarketConfig> {
        self.markets.iter().find(|m| m.name.as_str() == name)
    }

    pub fn by_address(&self, address: &Address) -> Option<&MarketConfig> {
        self.markets.iter().find(|m| &m.address == address)
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }
}
