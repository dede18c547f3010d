//! Environment-driven configuration
//!
//! Every setting has a sane default so the bot can start from a bare
//! `BOT_TOKEN`. Values are read once per call site; nothing here caches
//! process-wide state beyond what `std::env` already does.

/// Storage configuration
pub mod storage {
    /// Path to the SQLite database file
    pub fn database_path() -> String {
        std::env::var("DATABASE_PATH").unwrap_or_else(|_| "feedbot.sqlite".to_string())
    }
}

/// Network configuration
pub mod network {
    use std::time::Duration;

    /// Timeout for Telegram Bot API requests
    pub fn timeout() -> Duration {
        let secs = std::env::var("NETWORK_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);
        Duration::from_secs(secs)
    }
}

/// Search configuration
pub mod search {
    use std::time::Duration;

    /// ISO country code the bot instance serves. Country-gated providers
    /// (e.g. blackbox) only activate for their own country.
    pub fn country_code() -> String {
        std::env::var("COUNTRY_CODE").unwrap_or_else(|_| "ua".to_string())
    }

    /// Whether external (network) search providers are enabled at all.
    /// Disabled in tests and in degraded deployments.
    pub fn external_providers_enabled() -> bool {
        std::env::var("EXTERNAL_PROVIDERS")
            .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
            .unwrap_or(true)
    }

    /// TTL for cached provider auth tokens (blackbox CSRF token)
    pub fn token_ttl() -> Duration {
        let secs = std::env::var("PROVIDER_TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600);
        Duration::from_secs(secs)
    }

    /// Network timeout for provider HTTP calls
    pub fn provider_timeout() -> Duration {
        let secs = std::env::var("PROVIDER_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(15);
        Duration::from_secs(secs)
    }
}

/// Conversation input validation limits
pub mod validation {
    /// Minimum search term length in characters
    pub const MIN_SEARCH_TERM_LENGTH: usize = 2;
    /// Maximum search term length in characters
    pub const MAX_SEARCH_TERM_LENGTH: usize = 256;
    /// Maximum feedback description length in characters
    pub const MAX_DESCRIPTION_LENGTH: usize = 2048;
}
