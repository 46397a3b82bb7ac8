/// Non-interactive token sources.
///
/// A source produces a fresh token on every `fetch_token`; caching and
/// staleness are the token manager's business.
use std::collections::HashMap;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::client::{EndpointConfig, ValueSource};
use crate::error::AuthError;

#[derive(Debug, Clone)]
pub enum TokenSource {
    Static(ValueSource),
    Endpoint(EndpointSource),
}

impl TokenSource {
    pub fn name(&self) -> &'static str {
        match self {
            TokenSource::Static(_) => "static",
            TokenSource::Endpoint(_) => "endpoint",
        }
    }

    pub async fn fetch_token(&self) -> Result<String, AuthError> {
        match self {
            TokenSource::Static(value) => resolve_value(value).await,
            TokenSource::Endpoint(endpoint) => endpoint.fetch_token().await,
        }
    }
}

/// Calls a token endpoint and extracts the token with a JSON pointer
#[derive(Debug, Clone)]
pub struct EndpointSource {
    pub config: EndpointConfig,
    pub client: Client,
}

impl EndpointSource {
    pub fn new(config: EndpointConfig, client: Client) -> Self {
        Self { config, client }
    }

    pub async fn fetch_token(&self) -> Result<String, AuthError> {
        let cfg = &self.config;
        let mut request = self.client.request(cfg.method.clone(), &cfg.url);

        // Build headers dynamically
        if let Some(headers) = &cfg.headers {
            for (key, v) in headers {
                request = request.header(key, resolve_value(v).await?);
            }
        }
        // Build body dynamically
        if let Some(source_body) = &cfg.body {
            let mut body = HashMap::new();
            for (k, v) in source_body {
                body.insert(k.to_owned(), resolve_value(v).await?);
            }
            request = request.json(&body);
        }

        debug!(url = %cfg.url, method = %cfg.method, "requesting token");
        let response = request
            .send()
            .await
            .map_err(|e| AuthError::Refresh(format!("token request failed: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Refresh(format!("token endpoint returned {}", status)));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| AuthError::Refresh(format!("token response is not JSON: {}", e)))?;

        let token = body
            .pointer(&cfg.token_pointer)
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                AuthError::Refresh(format!("token not found at '{}'", cfg.token_pointer))
            })?;
        info!(url = %cfg.url, "token fetched from endpoint");
        Ok(token.to_owned())
    }
}

pub async fn resolve_value(value: &ValueSource) -> Result<String, AuthError> {
    match value {
        ValueSource::Literal { value } => Ok(value.to_owned()),
        ValueSource::FromEnv { from_env } => std::env::var(from_env)
            .map_err(|e| AuthError::Refresh(format!("env '{}': {}", from_env, e))),
        ValueSource::FromFile { from_file } => tokio::fs::read_to_string(from_file)
            .await
            .map(|content| content.trim().to_string())
            .map_err(|e| AuthError::Refresh(format!("file '{}': {}", from_file, e))),
    }
}
