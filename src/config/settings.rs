use serde::Deserialize;

pub const RETRIES_DEFAULT: u32 = 3;
pub const BASE_DELAY_MS_DEFAULT: u64 = 100;
pub const MAX_DELAY_MS_DEFAULT: u64 = 10_000;
pub const TIMEOUT_MS_DEFAULT: u64 = 30_000;

/// ================================
/// Retry policy
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RetryConfig {
    /// retries after the first attempt
    pub retries: Option<u32>,
    /// will be mutiply by 2 on every retry until max_delay_ms
    pub base_delay_ms: Option<u64>,
    /// invariant: >= base_delay_ms
    pub max_delay_ms: Option<u64>,
}

/// ================================
/// HTTP transport
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// per attempt; a timed out attempt is not retried
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_ms: TIMEOUT_MS_DEFAULT }
    }
}

fn default_timeout_ms() -> u64 {
    TIMEOUT_MS_DEFAULT
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_owned(), format: LogFormat::Compact }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "compact".to_string())
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}
