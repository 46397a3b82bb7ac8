use clap::ValueEnum;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::client::ClientConfig;
use crate::config::settings::{LogFormat, LoggingConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    TRACE,
    DEBUG,
    INFO,
    WARN,
    ERROR,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match *self {
            LogLevel::TRACE => "trace",
            LogLevel::DEBUG => "debug",
            LogLevel::INFO => "info",
            LogLevel::WARN => "warn",
            LogLevel::ERROR => "error",
        }
    }
}

/// Resolves the effective logging config: CLI level over config file over defaults.
pub fn resolve(client_config: Option<&ClientConfig>, arg_log_level: Option<LogLevel>) -> LoggingConfig {
    let configured = client_config
        .and_then(|config| config.logging.clone())
        .unwrap_or_else(|| LoggingConfig::new("info".to_owned(), LogFormat::from_env()));

    match arg_log_level {
        Some(level) => LoggingConfig::new(level.as_str().to_owned(), configured.format),
        None => configured,
    }
}

/// Initialize tracing with the desired config.
pub fn init_logging(cfg: &LoggingConfig) {
    let env_filter = EnvFilter::try_new(&cfg.level).unwrap_or_else(|_| EnvFilter::new("info"));

    // Base layer: filter + writer
    let registry = tracing_subscriber::registry().with(env_filter);

    // Choose format layer
    match cfg.format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_timer(UtcTime::rfc_3339())
                .flatten_event(true)
                .with_writer(std::io::stderr)
                .with_ansi(false);

            let _ = registry.with(layer).try_init();
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_timer(UtcTime::rfc_3339())
                .with_writer(std::io::stderr)
                .with_ansi(true);

            let _ = registry.with(layer).try_init();
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_level_overrides_configured_level() {
        let resolved = resolve(None, Some(LogLevel::DEBUG));
        assert_eq!(resolved.level, "debug");
        assert_eq!(resolve(None, None).level, "info");
    }
}
