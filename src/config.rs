use crate::error::{AppError, Result};

/// How long a post's exclusive auction runs from creation (seconds).
pub const AUCTION_DURATION_SECS: i64 = 3600;

/// Hard ceiling on total auction duration, anti-sniping extensions
/// included. Without a cap a determined bidder could push the deadline
/// out forever.
pub const MAX_AUCTION_DURATION_SECS: i64 = 6 * 3600;

/// Starting floor for the first bid on a post (minor currency units).
pub const STARTING_BID_MINOR: i64 = 5000;

/// Minimum increment over the current high bid (minor currency units).
pub const BID_INCREMENT_MINOR: i64 = 500;

/// A bid landing within this many seconds of the deadline triggers the
/// anti-sniping extension.
pub const ANTI_SNIPE_WINDOW_SECS: i64 = 60;

/// The extended deadline is `bid_time + ANTI_SNIPE_EXTENSION_SECS`, not
/// additive to the old deadline. The field only ever increases.
pub const ANTI_SNIPE_EXTENSION_SECS: i64 = 120;

/// Download grant allowance per won auction.
pub const GRANT_MAX_DOWNLOADS: i64 = 99;

/// Download grant lifetime (seconds): one year.
pub const GRANT_TTL_SECS: i64 = 365 * 24 * 3600;

/// Default sweeper tick interval (seconds).
pub const SWEEP_INTERVAL_SECS: u64 = 15;

/// Capacity of the notification channel between settlement and the
/// dispatcher task.
pub const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// How often the background sweeper scans for expired auctions
    /// (SWEEP_INTERVAL_SECS).
    pub sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "auction.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            sweep_interval_secs: std::env::var("SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| SWEEP_INTERVAL_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(SWEEP_INTERVAL_SECS),
        })
    }
}
