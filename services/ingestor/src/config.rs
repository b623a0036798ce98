use std::env;
use std::path::PathBuf;
use std::time::Duration;

use persistence::PoolSettings;
use types::candle::Resolution;
use types::errors::TypeError;

pub const DEFAULT_RPC_ENDPOINT: &str = "https://solana-api.projectserum.com";

/// Ingestor configuration derived from environment variables.
#[derive(Debug, Clone)]
pub struct IngestorConfig {
    /// Default cluster endpoint for markets without their own
    pub rpc_endpoint: String,
    pub interval: Duration,
    pub database_path: PathBuf,
    pub pool: PoolSettings,
    pub markets_file: PathBuf,
    pub resolutions: Vec<Resolution>,
    pub recent_trades: usize,
}

fn lookup_str(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    lookup(name)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn lookup_u64(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: u64) -> u64 {
    lookup(name)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Parse a comma separated resolution list such as `1,5,60,1D`.
pub fn parse_resolutions(raw: &str) -> Result<Vec<Resolution>, TypeError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

impl IngestorConfig {
    pub fn from_env() -> Result<Self, TypeError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TypeError> {
        let resolutions = match lookup("RESOLUTIONS").filter(|s| !s.trim().is_empty()) {
            Some(raw) => parse_resolutions(&raw)?,
            None => Resolution::all().to_vec(),
        };
        let defaults = PoolSettings::default();

        Ok(Self {
            rpc_endpoint: lookup_str(&lookup, "RPC_ENDPOINT_URL", DEFAULT_RPC_ENDPOINT),
            interval: Duration::from_secs(lookup_u64(&lookup, "INTERVAL", 10).max(1)),
            database_path: PathBuf::from(lookup_str(&lookup, "DATABASE_PATH", "candles.db")),
            pool: PoolSettings {
                max_size: lookup_u64(&lookup, "DB_MAX_CONN", u64::from(defaults.max_size)).max(1) as u32,
                acquire_timeout: Duration::from_secs(lookup_u64(
                    &lookup,
                    "DB_ACQUIRE_TIMEOUT_SECS",
                    defaults.acquire_timeout.as_secs(),
                )),
                ..defaults
            },
            markets_file: PathBuf::from(lookup_str(&lookup, "MARKETS_FILE", "markets.json")),
            resolutions,
            recent_trades: lookup_u64(&lookup, "RECENT_TRADES", 100).max(1) as usize,
        })
    }
}
