use http::Method;
use serde::Deserialize;
use std::collections::HashMap;

use crate::config::settings::{HttpConfig, LoggingConfig, RetryConfig};

pub const TOKEN_POINTER_DEFAULT: &str = "/access_token";

/// ================================
/// Full client configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub tenant_id: String,
    #[serde(default)]
    pub http: HttpConfig,
    pub retry: Option<RetryConfig>,
    pub logging: Option<LoggingConfig>,
    pub credentials: CredentialConfig,
}

/// ================================
/// Credentials
/// ================================
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialConfig {
    /// fixed token, re-read from its source on refresh
    Static { token: ValueSource },
    /// token endpoint called on every refresh
    Endpoint(EndpointConfig),
    /// interactive sign-in; the flow itself is supplied in code
    Portal { config_key: String },
}

#[derive(Debug, Deserialize, Clone)]
pub struct EndpointConfig {
    pub url: String,
    #[serde(with = "http_serde::method", default = "default_method")]
    pub method: Method,
    pub headers: Option<HashMap<String, ValueSource>>,
    pub body: Option<HashMap<String, ValueSource>>,
    /// JSON pointer to the token in the response body
    #[serde(default = "default_token_pointer")]
    pub token_pointer: String,
}

/// Where a secret value comes from
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum ValueSource {
    Literal { value: String },
    FromEnv { from_env: String },
    FromFile { from_file: String },
}

fn default_method() -> Method {
    Method::POST
}

fn default_token_pointer() -> String {
    TOKEN_POINTER_DEFAULT.to_owned()
}
