// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::Client;

use crate::auth::jwt::encode_test_jwt;
use crate::auth::lifecycle::TokenManager;
use crate::auth::provider::CredentialProvider;
use crate::auth::session::SessionStore;
use crate::auth::source::TokenSource;
use crate::config::client::{ClientConfig, CredentialConfig, ValueSource};
use crate::config::settings::{HttpConfig, RetryConfig};
use crate::helpers::time::now_i64;
use crate::resilience::retry::RetrySettings;
use crate::transport::http::Transport;

pub const TENANT: &str = "t1";

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

/// JWT valid for another hour
pub fn fresh_jwt() -> String {
    encode_test_jwt(now_i64() + 3600)
}

/// JWT that expired a minute ago
pub fn expired_jwt() -> String {
    encode_test_jwt(now_i64() - 60)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

/// Fast retries so exhaustion tests finish quickly
pub fn fast_retry() -> RetrySettings {
    RetrySettings { retries: 3, base_delay_ms: 20, max_delay_ms: 1_000 }
}

/// Client config against `base_url` with a literal, non-expiring token
pub fn static_config(base_url: &str) -> ClientConfig {
    ClientConfig {
        base_url: base_url.to_owned(),
        tenant_id: TENANT.to_owned(),
        http: HttpConfig::default(),
        retry: Some(RetryConfig { retries: Some(3), base_delay_ms: Some(10), max_delay_ms: Some(200) }),
        logging: None,
        credentials: CredentialConfig::Static {
            token: ValueSource::Literal { value: fresh_jwt() },
        },
    }
}

/// Transport whose session already holds `token`
pub async fn transport_with_token(base_url: &str, token: String, retry: RetrySettings) -> Transport {
    transport_with_client(base_url, Some(token), retry, build_reqwest_client()).await
}

/// Transport over `client`; the session holds `token` when one is given
pub async fn transport_with_client(
    base_url: &str,
    token: Option<String>,
    retry: RetrySettings,
    client: Client,
) -> Transport {
    let provider = CredentialProvider::NonInteractive(TokenSource::Static(ValueSource::Literal {
        value: token.clone().unwrap_or_default(),
    }));
    let session = SessionStore::new();
    if let Some(token) = token {
        session.set_access_token(token).await;
    }
    let tokens = Arc::new(TokenManager::new(provider, session));
    Transport::new(client, base_url, tokens, retry)
}

/// Tenant metadata with one `order` entity served by `orders-api`
pub fn tenant_meta_body() -> serde_json::Value {
    json!({
        "entitiesMeta": [{
            "id": "order",
            "apiId": "orders-api",
            "properties": [
                {"id": "no", "name": "Number", "dataTypeId": "text", "jsonBaseType": "string", "isRequired": true},
                {
                    "id": "status",
                    "name": "Status",
                    "dataTypeId": "enum",
                    "jsonBaseType": "string",
                    "enumOptions": [
                        {"value": "shipped", "label": "Shipped"},
                        {"value": "open", "label": "Open", "behaviors": ["default"]},
                        {"value": 1, "label": "Priority"},
                        {"value": "7", "label": "Lucky"},
                        {"value": null, "label": "None"}
                    ]
                },
                {"id": "note", "name": "Note"}
            ]
        }],
        "loginProviders": [
            {"providerId": "google.com", "isEnabled": true},
            {"providerId": "microsoft.com", "isEnabled": true}
        ]
    })
}
