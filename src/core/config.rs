use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: database.sqlite
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "database.sqlite".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: bot.log
pub static LOG_FILE_PATH: Lazy<String> = Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "bot.log".to_string()));

/// Telegram channel the shop requires a subscription to (`@name` or `-100…` id)
/// Read from CHANNEL_ID environment variable; empty disables the gate
pub static CHANNEL_ID: Lazy<String> = Lazy::new(|| env::var("CHANNEL_ID").unwrap_or_else(|_| String::new()));

/// Public invite link shown to unsubscribed users
/// Read from CHANNEL_LINK environment variable
pub static CHANNEL_LINK: Lazy<Option<String>> = Lazy::new(|| env::var("CHANNEL_LINK").ok());

/// Base URL of the payment page; the order id is appended as a path segment
/// Read from PAYMENT_URL_BASE environment variable
pub static PAYMENT_URL_BASE: Lazy<String> =
    Lazy::new(|| env::var("PAYMENT_URL_BASE").unwrap_or_else(|_| "https://example.com/pay".to_string()));

/// CSV file the order export sink appends to
/// Read from ORDERS_EXPORT_PATH environment variable
pub static ORDERS_EXPORT_PATH: Lazy<String> =
    Lazy::new(|| env::var("ORDERS_EXPORT_PATH").unwrap_or_else(|_| "orders.csv".to_string()));

/// Broadcast scheduler configuration
pub mod broadcast {
    use super::{env, Duration, Lazy};

    /// Interval between scheduler iterations (seconds)
    pub static POLL_INTERVAL_SECS: Lazy<u64> = Lazy::new(|| {
        env::var("BROADCAST_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60)
    });

    /// Pause between two outbound sends (milliseconds), keeps us under
    /// Telegram's per-bot rate limits
    pub const SEND_DELAY_MS: u64 = 100;

    /// A broadcast stuck in `sending` longer than this is reset to
    /// `pending` at the start of the next iteration
    pub static STALE_SENDING_SECS: Lazy<i64> = Lazy::new(|| {
        env::var("BROADCAST_STALE_SENDING_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(900)
    });

    pub fn poll_interval() -> Duration {
        Duration::from_secs(*POLL_INTERVAL_SECS)
    }

    pub fn send_delay() -> Duration {
        Duration::from_millis(SEND_DELAY_MS)
    }
}

/// Dispatcher restart policy
pub mod retry {
    use super::Duration;

    pub const MAX_DISPATCHER_RETRIES: u32 = 5;
    pub const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

    pub fn backoff(retry_count: u32) -> Duration {
        Duration::from_secs(EXPONENTIAL_BACKOFF_BASE.pow(retry_count))
    }
}

/// Catalog presentation configuration
pub mod catalog {
    /// Categories per page in inline keyboards
    pub const PAGE_SIZE: usize = 5;

    /// Largest quantity offered by the quantity picker
    pub const MAX_QUANTITY: i64 = 10;
}

/// FAQ search configuration
pub mod faq {
    /// Maximum number of search hits shown to the user
    pub const SEARCH_LIMIT: i64 = 7;

    /// Fallback: newest questions shown when the search finds nothing
    pub const FALLBACK_LIMIT: i64 = 3;
}
