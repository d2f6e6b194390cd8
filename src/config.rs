use crate::error::{AppError, Result};

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// Max concurrent calls per batch window. Windows run sequentially;
/// calls within a window run in parallel.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Participants / ticket-history page size.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Cache TTL for active (not completed) draws, in seconds.
/// Completed draws are immutable and cached without expiry.
pub const ACTIVE_TTL_SECS: u64 = 60;

/// Cache TTL for the series list and per-series metadata, in seconds.
/// Series are append-only on chain; staleness here only delays discovery
/// of a newly created series.
pub const SERIES_TTL_SECS: u64 = 300;

/// Per-request timeout for the mirror API. Past this the mirror tier is
/// treated as a miss and the chain tier takes over.
pub const MIRROR_TIMEOUT_SECS: u64 = 10;

/// Channel capacity for the cache persistence queue.
pub const CHANNEL_CAPACITY: usize = 1024;

/// Background refresh interval (seconds): how often the series list and
/// cached active draws are re-fetched.
pub const REFRESH_INTERVAL_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: String,
    pub contract_address: String,
    /// Mirror API base URL (MIRROR_API_URL). Unset disables the mirror tier
    /// entirely; every miss then goes straight to the chain.
    pub mirror_api_url: Option<String>,
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Concurrent item fetches per window (SYNC_BATCH_SIZE)
    pub batch_size: usize,
    /// Items per page for participants / ticket history (SYNC_PAGE_SIZE)
    pub page_size: usize,
    /// TTL for active draw entries in seconds (SYNC_ACTIVE_TTL_SECS)
    pub active_ttl_secs: u64,
    /// Background refresh interval in seconds (SYNC_REFRESH_INTERVAL_SECS)
    pub refresh_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            rpc_url: std::env::var("RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.to_string()),
            contract_address: std::env::var("CONTRACT_ADDRESS").map_err(|_| {
                AppError::Config("CONTRACT_ADDRESS must be set to the lottery contract".to_string())
            })?,
            mirror_api_url: std::env::var("MIRROR_API_URL")
                .ok()
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "syncd.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            batch_size: std::env::var("SYNC_BATCH_SIZE")
                .unwrap_or_else(|_| DEFAULT_BATCH_SIZE.to_string())
                .parse::<usize>()
                .unwrap_or(DEFAULT_BATCH_SIZE)
                .max(1),
            page_size: std::env::var("SYNC_PAGE_SIZE")
                .unwrap_or_else(|_| DEFAULT_PAGE_SIZE.to_string())
                .parse::<usize>()
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .max(1),
            active_ttl_secs: std::env::var("SYNC_ACTIVE_TTL_SECS")
                .unwrap_or_else(|_| ACTIVE_TTL_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(ACTIVE_TTL_SECS),
            refresh_interval_secs: std::env::var("SYNC_REFRESH_INTERVAL_SECS")
                .unwrap_or_else(|_| REFRESH_INTERVAL_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(REFRESH_INTERVAL_SECS),
        })
    }
}
