use std::path::Path;
use std::sync::LazyLock;

use anyhow::{anyhow, Result};
use regex::Regex;
use tracing::{debug, error};

use crate::config::client::ClientConfig;
use crate::config::settings::{LoggingConfig, RetryConfig};
use crate::config::settings::{BASE_DELAY_MS_DEFAULT, MAX_DELAY_MS_DEFAULT, RETRIES_DEFAULT};
use crate::config::validator;

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}").expect("env var pattern is valid")
});

/// Load and validate config from YAML file
pub async fn file_to_config(path: &Path) -> Result<ClientConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow!("cannot read config {}: {}", path.display(), e))?;

    parse_config(&expand_env_vars(&content))
}

pub fn parse_config(content: &str) -> Result<ClientConfig> {
    let mut config: ClientConfig = serde_yaml::from_str(content)
        .inspect_err(|e| error!("parse config error: {}", e))?;

    // Apply defaults
    if config.logging.is_none() {
        config.logging = Some(LoggingConfig::default());
    }
    let retry = config.retry.get_or_insert_with(RetryConfig::default);
    retry.retries.get_or_insert(RETRIES_DEFAULT);
    retry.base_delay_ms.get_or_insert(BASE_DELAY_MS_DEFAULT);
    retry.max_delay_ms.get_or_insert(MAX_DELAY_MS_DEFAULT);

    debug!("validation config ...");
    validator::validate_client_config(&config)
        .map_err(|errors| anyhow!("invalid config:\n  {}", errors.join("\n  ")))?;

    Ok(config)
}

/// Replaces `${VAR}` and `${VAR:default}` with environment values.
pub fn expand_env_vars(input: &str) -> String {
    ENV_VAR
        .replace_all(input, |caps: &regex::Captures| {
            let var = &caps[1];
            let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(var).unwrap_or_else(|_| default.to_string())
        })
        .to_string()
}
