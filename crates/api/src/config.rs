//! Application configuration loaded from environment variables.

use std::str::FromStr;

use domain::StockPolicy;
use notifications::DEFAULT_DEAD_LETTER_CAPACITY;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
/// - `DATABASE_URL`: PostgreSQL URL; unset means the in-memory store
/// - `STOCK_POLICY`: `check` or `reserve` (default: `check`)
/// - `NOTIFY_QUEUE_CAPACITY`: notification queue size (default: `1024`)
/// - `NOTIFY_MAX_ATTEMPTS`: delivery attempts per notification (default: `3`)
/// - `NOTIFY_DEAD_LETTER_CAPACITY`: dead letters kept before the oldest is
///   evicted (default: `1000`)
///
/// Unparseable values fall back to the default with a warning.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub stock_policy: StockPolicy,
    pub notify_queue_capacity: usize,
    pub notify_max_attempts: u32,
    pub notify_dead_letter_capacity: usize,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: parse_or(&lookup, "LOG_FORMAT", defaults.log_format),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            stock_policy: parse_or(&lookup, "STOCK_POLICY", defaults.stock_policy),
            notify_queue_capacity: parse_or(
                &lookup,
                "NOTIFY_QUEUE_CAPACITY",
                defaults.notify_queue_capacity,
            ),
            notify_max_attempts: parse_or(
                &lookup,
                "NOTIFY_MAX_ATTEMPTS",
                defaults.notify_max_attempts,
            ),
            notify_dead_letter_capacity: parse_or(
                &lookup,
                "NOTIFY_DEAD_LETTER_CAPACITY",
                defaults.notify_dead_letter_capacity,
            ),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            tracing::warn!(key, value = %raw, error = %e, "invalid configuration value, using default");
            default
        }),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            stock_policy: StockPolicy::Check,
            notify_queue_capacity: 1024,
            notify_max_attempts: 3,
            notify_dead_letter_capacity: DEFAULT_DEAD_LETTER_CAPACITY,
        }
    }
}
