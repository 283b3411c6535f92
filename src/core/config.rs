use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Configuration constants for the bot
/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: cafebot.sqlite
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "cafebot.sqlite".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: cafebot.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "cafebot.log".to_string()));

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Public base URL Telegram delivers webhook updates to (https://host)
/// Read from WEBHOOK_URL environment variable
pub static WEBHOOK_URL: Lazy<Option<String>> = Lazy::new(|| env::var("WEBHOOK_URL").ok());

/// Local port the webhook listener binds to
/// Read from WEBHOOK_PORT environment variable
/// Default: 8080
pub static WEBHOOK_PORT: Lazy<u16> = Lazy::new(|| {
    env::var("WEBHOOK_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080)
});

/// Secret carried in the webhook path and echoed back by Telegram in the
/// X-Telegram-Bot-Api-Secret-Token header
/// Read from WEBHOOK_SECRET environment variable
pub static WEBHOOK_SECRET: Lazy<Option<String>> = Lazy::new(|| env::var("WEBHOOK_SECRET").ok());

/// Fallback image for catalog items without an uploaded photo
/// Read from PLACEHOLDER_IMAGE_URL environment variable
pub static PLACEHOLDER_IMAGE_URL: Lazy<String> = Lazy::new(|| {
    env::var("PLACEHOLDER_IMAGE_URL")
        .unwrap_or_else(|_| "https://via.placeholder.com/400x300.png?text=No+Photo".to_string())
});

/// Administrator configuration
pub mod admin {
    use once_cell::sync::Lazy;
    use std::env;

    /// Static admin allow-list, comma-separated Telegram user ids
    /// Read from ADMIN_IDS environment variable
    /// Entries here are admins even without a roster row in the database
    pub static ADMIN_IDS: Lazy<Vec<i64>> = Lazy::new(|| {
        env::var("ADMIN_IDS")
            .unwrap_or_default()
            .split(',')
            .filter_map(|s| s.trim().parse::<i64>().ok())
            .collect()
    });
}

/// Wizard session store configuration
pub mod session {
    use super::Duration;

    /// Idle lifetime of a wizard session (in seconds)
    pub const TTL_SECONDS: u64 = 1800; // 30 minutes

    /// Interval between sweeps of expired sessions (in seconds)
    pub const CLEANUP_INTERVAL_SECS: u64 = 300;

    /// Session TTL duration
    pub fn ttl() -> Duration {
        Duration::from_secs(TTL_SECONDS)
    }

    /// Cleanup sweep interval duration
    pub fn cleanup_interval() -> Duration {
        Duration::from_secs(CLEANUP_INTERVAL_SECS)
    }
}

/// Input validation limits
pub mod validation {
    /// Maximum length of a catalog item name
    pub const MAX_ITEM_NAME_LEN: usize = 100;

    /// Maximum length of a catalog item description
    pub const MAX_DESCRIPTION_LEN: usize = 500;

    /// Maximum accepted price (in minor units), guards against typos
    pub const MAX_PRICE_CENTS: i64 = 1_000_000;

    /// Maximum quantity accepted per /order command
    pub const MAX_ORDER_QUANTITY: i64 = 100;

    /// How many orders the admin panel lists
    pub const RECENT_ORDERS_LIMIT: usize = 10;
}

/// Retry configuration
pub mod retry {
    use super::Duration;

    /// Maximum number of retries for dispatcher reconnection
    pub const MAX_DISPATCHER_RETRIES: u32 = 5;

    /// Delay between dispatcher retry attempts (in seconds)
    pub const DISPATCHER_RETRY_DELAY_SECS: u64 = 5;

    /// Dispatcher retry delay duration
    pub fn dispatcher_delay() -> Duration {
        Duration::from_secs(DISPATCHER_RETRY_DELAY_SECS)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Timeout for Telegram API requests (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}
