//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Checks the base URL, tenant, retry, logging and credential invariants

use reqwest::Url;

use crate::config::client::{ClientConfig, CredentialConfig, ValueSource};
use crate::config::settings::{LoggingConfig, RetryConfig};

const MAX_RETRIES: u32 = 10;
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub fn validate_client_config(cfg: &ClientConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    if cfg.base_url.trim().is_empty() {
        errors.push("config: 'base_url' must not be empty".to_string());
    } else if let Err(e) = Url::parse(&cfg.base_url) {
        errors.push(format!("config: 'base_url' '{}' is not a valid URL: {}", cfg.base_url, e));
    }

    if cfg.tenant_id.trim().is_empty() {
        errors.push("config: 'tenant_id' must not be empty".to_string());
    }

    if cfg.http.timeout_ms == 0 {
        errors.push("http.timeout_ms must be > 0".to_string());
    }

    if let Some(retry) = &cfg.retry {
        validate_retry(retry, &mut errors);
    }
    if let Some(logging) = &cfg.logging {
        validate_logging(logging, &mut errors);
    }
    validate_credentials(&cfg.credentials, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_retry(retry: &RetryConfig, errors: &mut Vec<String>) {
    if let Some(retries) = retry.retries {
        if retries > MAX_RETRIES {
            errors.push(format!("retry.retries must be <= {}, got {}", MAX_RETRIES, retries));
        }
    }
    if let Some(base) = retry.base_delay_ms {
        if base == 0 {
            errors.push("retry.base_delay_ms must be > 0".to_string());
        }
        if let Some(max) = retry.max_delay_ms {
            if max < base {
                errors.push(format!(
                    "retry.max_delay_ms ({}) must be >= retry.base_delay_ms ({})",
                    max, base
                ));
            }
        }
    }
}

fn validate_logging(logging: &LoggingConfig, errors: &mut Vec<String>) {
    if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
        errors.push(format!(
            "logging.level '{}' is invalid; allowed: {}",
            logging.level,
            LOG_LEVELS.join(", ")
        ));
    }
}

fn validate_credentials(credentials: &CredentialConfig, errors: &mut Vec<String>) {
    match credentials {
        CredentialConfig::Static { token } => validate_value_source("credentials.token", token, errors),
        CredentialConfig::Endpoint(endpoint) => {
            if Url::parse(&endpoint.url).is_err() {
                errors.push(format!("credentials.url '{}' is not a valid URL", endpoint.url));
            }
            if !endpoint.token_pointer.starts_with('/') {
                errors.push(format!(
                    "credentials.token_pointer '{}' must be a JSON pointer starting with '/'",
                    endpoint.token_pointer
                ));
            }
            for (name, value) in endpoint.headers.iter().flatten() {
                validate_value_source(&format!("credentials.headers.{}", name), value, errors);
            }
            for (name, value) in endpoint.body.iter().flatten() {
                validate_value_source(&format!("credentials.body.{}", name), value, errors);
            }
        }
        CredentialConfig::Portal { config_key } => {
            if config_key.trim().is_empty() {
                errors.push("credentials.config_key must not be empty".to_string());
            }
        }
    }
}

fn validate_value_source(field: &str, value: &ValueSource, errors: &mut Vec<String>) {
    let empty = match value {
        ValueSource::Literal { .. } => false,
        ValueSource::FromEnv { from_env } => from_env.trim().is_empty(),
        ValueSource::FromFile { from_file } => from_file.trim().is_empty(),
    };
    if empty {
        errors.push(format!("{}: source name must not be empty", field));
    }
}
