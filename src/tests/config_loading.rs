// YAML loading: env expansion, defaults and aggregated validation errors.

#[cfg(test)]
mod test {

use std::io::Write;

use httpmock::prelude::*;
use serde_json::json;
use serial_test::serial;

use crate::config::client::{CredentialConfig, ValueSource};
use crate::config::loader::{expand_env_vars, file_to_config, parse_config};
use crate::config::settings::{LogFormat, BASE_DELAY_MS_DEFAULT, RETRIES_DEFAULT, TIMEOUT_MS_DEFAULT};
use crate::entities::client::EntityClient;
use crate::metadata::cache::tenant_meta_path;
use crate::tests::common::{fresh_jwt, tenant_meta_body, TENANT};

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn env_placeholders_expand_with_defaults() {
    std::env::set_var("ENTITY_CLIENT_TEST_TENANT", "acme");
    std::env::remove_var("ENTITY_CLIENT_TEST_UNSET");

    let expanded = expand_env_vars("tenant_id: ${ENTITY_CLIENT_TEST_TENANT}\nbase: ${ENTITY_CLIENT_TEST_UNSET:http://localhost:8080}");
    assert_eq!(expanded, "tenant_id: acme\nbase: http://localhost:8080");

    std::env::remove_var("ENTITY_CLIENT_TEST_TENANT");
}

#[test]
fn defaults_are_applied() {
    let cfg = parse_config(
        r#"
base_url: https://api.example.com
tenant_id: t1
credentials:
  type: static
  token:
    value: abc
"#,
    )
    .unwrap();

    assert_eq!(cfg.http.timeout_ms, TIMEOUT_MS_DEFAULT);
    let retry = cfg.retry.unwrap();
    assert_eq!(retry.retries, Some(RETRIES_DEFAULT));
    assert_eq!(retry.base_delay_ms, Some(BASE_DELAY_MS_DEFAULT));
    let logging = cfg.logging.unwrap();
    assert_eq!(logging.level, "info");
    assert_eq!(logging.format, LogFormat::Compact);
    assert!(matches!(
        cfg.credentials,
        CredentialConfig::Static { token: ValueSource::Literal { ref value } } if value == "abc"
    ));
}

#[test]
fn endpoint_credentials_parse() {
    let cfg = parse_config(
        r#"
base_url: https://api.example.com
tenant_id: t1
credentials:
  type: endpoint
  url: https://auth.example.com/token
  method: GET
  headers:
    x-api-key:
      from_env: API_KEY
  token_pointer: /data/token
"#,
    )
    .unwrap();

    match cfg.credentials {
        CredentialConfig::Endpoint(endpoint) => {
            assert_eq!(endpoint.method, http::Method::GET);
            assert_eq!(endpoint.token_pointer, "/data/token");
            assert_eq!(
                endpoint.headers.unwrap()["x-api-key"],
                ValueSource::FromEnv { from_env: "API_KEY".into() }
            );
        }
        other => panic!("expected endpoint credentials, got {:?}", other),
    }
}

#[test]
fn validation_errors_are_aggregated() {
    let err = parse_config(
        r#"
base_url: not a url
tenant_id: ""
retry:
  retries: 50
  base_delay_ms: 500
  max_delay_ms: 100
logging:
  level: loud
  format: json
credentials:
  type: portal
  config_key: ""
"#,
    )
    .unwrap_err()
    .to_string();

    assert!(err.starts_with("invalid config:"), "{}", err);
    for fragment in [
        "'base_url'",
        "'tenant_id' must not be empty",
        "retry.retries must be <= 10",
        "retry.max_delay_ms (100) must be >= retry.base_delay_ms (500)",
        "logging.level 'loud' is invalid",
        "credentials.config_key must not be empty",
    ] {
        assert!(err.contains(fragment), "missing '{}' in:\n{}", fragment, err);
    }
}

#[tokio::test]
#[serial]
async fn file_config_drives_a_working_client() {
    let server = MockServer::start_async().await;
    let token = fresh_jwt();
    let meta = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(tenant_meta_path(TENANT))
                .header("authorization", format!("Bearer {}", token));
            then.status(200).json_body(tenant_meta_body());
        })
        .await;

    let token_file = write_config(&format!("{}\n", token));
    std::env::set_var("ENTITY_CLIENT_TEST_BASE_URL", server.base_url());
    let file = write_config(&format!(
        r#"
base_url: ${{ENTITY_CLIENT_TEST_BASE_URL}}
tenant_id: {}
http:
  timeout_ms: 2000
credentials:
  type: static
  token:
    from_file: {}
"#,
        TENANT,
        token_file.path().display()
    ));

    let cfg = file_to_config(file.path()).await.unwrap();
    std::env::remove_var("ENTITY_CLIENT_TEST_BASE_URL");
    assert_eq!(cfg.base_url, server.base_url());

    let client = EntityClient::from_config(&cfg).unwrap();
    client.initialize().await.unwrap();
    assert_eq!(
        client.get_enum_label("order", "status", &json!("open")).await,
        json!("Open")
    );
    meta.assert_async().await;
}

#[tokio::test]
async fn missing_file_is_reported() {
    let err = file_to_config(std::path::Path::new("/nonexistent/entity-client.yaml"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("cannot read config"));
}

}
