// Tenant metadata is fetched once per tenant no matter how many callers
// arrive together, and only successful loads are kept.

#[cfg(test)]
mod test {

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use httpmock::prelude::*;
use serde_json::json;

use crate::entities::client::EntityClient;
use crate::metadata::cache::tenant_meta_path;
use crate::tests::common::{static_config, tenant_meta_body, TENANT};

async fn ready_client(server: &MockServer) -> EntityClient {
    let client = EntityClient::from_config(&static_config(&server.base_url())).unwrap();
    client.initialize().await.unwrap();
    client
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_access_loads_once() {
    let server = MockServer::start_async().await;
    let meta = server
        .mock_async(|when, then| {
            when.method(GET).path(tenant_meta_path(TENANT));
            then.status(200)
                .delay(Duration::from_millis(100))
                .json_body(tenant_meta_body());
        })
        .await;
    let client = ready_client(&server).await;

    let loaded = join_all((0..8).map(|_| client.metadata().ensure_loaded(TENANT))).await;
    let first = loaded[0].as_ref().unwrap().clone();
    for metadata in &loaded {
        assert!(Arc::ptr_eq(metadata.as_ref().unwrap(), &first));
    }
    assert_eq!(first.entity("order").unwrap().api_id, "orders-api");
    meta.assert_calls_async(1).await;
    assert!(client.metadata().is_loaded(TENANT).await);
}

#[tokio::test]
async fn invalidate_forces_a_reload() {
    let server = MockServer::start_async().await;
    let meta = server
        .mock_async(|when, then| {
            when.method(GET).path(tenant_meta_path(TENANT));
            then.status(200).json_body(tenant_meta_body());
        })
        .await;
    let client = ready_client(&server).await;

    client.get_entity_properties("order").await.unwrap();
    client.get_entity_properties("order").await.unwrap();
    meta.assert_calls_async(1).await;

    client.invalidate_metadata().await;
    assert!(!client.metadata().is_loaded(TENANT).await);
    client.get_entity_properties("order").await.unwrap();
    meta.assert_calls_async(2).await;
}

#[tokio::test]
async fn failed_load_is_not_cached() {
    let server = MockServer::start_async().await;
    let meta = server
        .mock_async(|when, then| {
            when.method(GET).path(tenant_meta_path(TENANT));
            then.status(403).json_body(json!({"message": "tenant disabled"}));
        })
        .await;
    let client = ready_client(&server).await;

    let err = client.get("order", "r1").await.unwrap_err();
    assert_eq!(err.code, 403);
    assert_eq!(err.message, "tenant disabled");
    assert!(!client.metadata().is_loaded(TENANT).await);

    client.get("order", "r1").await.unwrap_err();
    meta.assert_calls_async(2).await;
}

#[tokio::test]
async fn metadata_without_entities_is_rejected() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(tenant_meta_path(TENANT));
            then.status(200).json_body(json!({"loginProviders": []}));
        })
        .await;
    let client = ready_client(&server).await;

    let err = client.metadata().ensure_loaded(TENANT).await.unwrap_err();
    assert_eq!(err.code, 502);
    assert!(err.message.starts_with("invalid tenant metadata"));
    assert!(!client.metadata().is_loaded(TENANT).await);
}

#[tokio::test]
async fn properties_are_normalized() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(tenant_meta_path(TENANT));
            then.status(200).json_body(tenant_meta_body());
        })
        .await;
    let client = ready_client(&server).await;

    let properties = client.get_entity_properties("order").await.unwrap();
    assert_eq!(properties.len(), 3);
    let note = properties.iter().find(|p| p.id == "note").unwrap();
    assert_eq!(note.data_type_id, "");
    assert!(!note.is_required);
    assert!(note.enum_options.is_none());

    let err = client.get_entity_properties("ghost").await.unwrap_err();
    assert_eq!(err.code, 404);
    assert_eq!(err.message, "Entity ghost not found");
}

}
