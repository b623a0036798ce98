use std::env;
use std::path::PathBuf;
use std::time::Duration;

use persistence::PoolSettings;

/// Gateway configuration derived from environment variables.
///
/// Storage variables match the ingestor's so both processes can share one
/// `.env` file.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
    pub database_path: PathBuf,
    pub pool: PoolSettings,
    pub markets_file: PathBuf,
    pub recent_trades: usize,
}

fn env_str(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let defaults = PoolSettings::default();
        Self {
            port: u16::try_from(env_u64("PORT", 5000)).unwrap_or(5000),
            database_path: PathBuf::from(env_str("DATABASE_PATH", "candles.db")),
            pool: PoolSettings {
                max_size: u32::try_from(env_u64("DB_MAX_CONN", u64::from(defaults.max_size)))
                    .unwrap_or(defaults.max_size)
                    .max(1),
                acquire_timeout: Duration::from_secs(env_u64(
                    "DB_ACQUIRE_TIMEOUT_SECS",
                    defaults.acquire_timeout.as_secs(),
                )),
                ..defaults
            },
            markets_file: PathBuf::from(env_str("MARKETS_FILE", "markets.json")),
            recent_trades: env_u64("RECENT_TRADES", 100).max(1) as usize,
        }
    }
}
