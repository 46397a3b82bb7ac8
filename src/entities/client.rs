/// Entity router
///
/// Public CRUD surface. Every operation resolves the entity's route segment
/// from tenant metadata first; unknown entities fail with a 404 value and
/// never reach the network.
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::auth::lifecycle::TokenManager;
use crate::auth::provider::CredentialProvider;
use crate::auth::session::SessionStore;
use crate::config::client::ClientConfig;
use crate::entities::routes::{EntityRoute, Query, ARCHIVED_FLAG};
use crate::error::{ApiError, ApiResult};
use crate::metadata::cache::MetadataCache;
use crate::metadata::models::{AssociationPatch, PropertyMetadata};
use crate::resilience::retry::RetrySettings;
use crate::transport::http::Transport;

#[derive(Debug, Clone)]
pub struct EntityClient {
    tenant_id: String,
    transport: Arc<Transport>,
    metadata: Arc<MetadataCache>,
}

impl EntityClient {
    pub fn new(tenant_id: impl Into<String>, transport: Arc<Transport>, metadata: Arc<MetadataCache>) -> Self {
        Self { tenant_id: tenant_id.into(), transport, metadata }
    }

    /// Builds the whole stack from configuration with a non-interactive provider.
    pub fn from_config(cfg: &ClientConfig) -> Result<Self> {
        let client = build_http_client(cfg)?;
        let provider = CredentialProvider::from_config(&cfg.credentials, &client)?;
        Ok(Self::assemble(cfg, client, provider))
    }

    /// Builds the whole stack around an already constructed provider.
    pub fn with_provider(cfg: &ClientConfig, provider: CredentialProvider) -> Result<Self> {
        let client = build_http_client(cfg)?;
        Ok(Self::assemble(cfg, client, provider))
    }

    fn assemble(cfg: &ClientConfig, client: Client, provider: CredentialProvider) -> Self {
        let tokens = Arc::new(TokenManager::new(provider, SessionStore::new()));
        let retry = cfg.retry.as_ref().map(RetrySettings::from).unwrap_or_default();
        let transport = Arc::new(Transport::new(client, cfg.base_url.clone(), tokens, retry));
        let metadata = Arc::new(MetadataCache::new(transport.clone()));
        info!(base_url = %cfg.base_url, tenant_id = %cfg.tenant_id, "entity client configured");
        Self::new(cfg.tenant_id.clone(), transport, metadata)
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        self.transport.tokens()
    }

    pub fn metadata(&self) -> &Arc<MetadataCache> {
        &self.metadata
    }

    /// Initializes the credential provider. Must complete before the first request.
    ///
    /// Non-interactive providers fetch their first token here. Run it again to
    /// recover after a failed refresh has cleared the session.
    pub async fn initialize(&self) -> ApiResult<()> {
        self.tokens().initialize().await.map_err(ApiError::from)
    }

    // ----- rows -----

    pub async fn list(&self, entity_id: &str, query: Option<&Query>) -> ApiResult<Value> {
        self.list_rows(entity_id, query).await
    }

    /// Same as [`EntityClient::list`].
    pub async fn list_entity_data(&self, entity_id: &str, query: Option<&Query>) -> ApiResult<Value> {
        self.list_rows(entity_id, query).await
    }

    pub async fn get(&self, entity_id: &str, row_id: &str) -> ApiResult<Value> {
        self.get_row(entity_id, row_id).await
    }

    /// Same as [`EntityClient::get`].
    pub async fn get_entity_data(&self, entity_id: &str, row_id: &str) -> ApiResult<Value> {
        self.get_row(entity_id, row_id).await
    }

    pub async fn create<B: Serialize + ?Sized>(&self, entity_id: &str, data: &B) -> ApiResult<Value> {
        let api_id = self.api_id(entity_id).await?;
        let route = EntityRoute::collection(&api_id, &self.tenant_id, entity_id);
        self.transport.post(&route.to_string(), data).await
    }

    /// Partial update: only the fields in `data` change.
    pub async fn update<B: Serialize + ?Sized>(&self, entity_id: &str, row_id: &str, data: &B) -> ApiResult<Value> {
        let api_id = self.api_id(entity_id).await?;
        let route = EntityRoute::collection(&api_id, &self.tenant_id, entity_id).row(row_id);
        self.transport.patch(&route.to_string(), data).await
    }

    pub async fn update_associations(
        &self,
        entity_id: &str,
        row_id: &str,
        patch: &AssociationPatch,
    ) -> ApiResult<Value> {
        let api_id = self.api_id(entity_id).await?;
        let route = EntityRoute::collection(&api_id, &self.tenant_id, entity_id)
            .row(row_id)
            .associations();
        self.transport.patch(&route.to_string(), patch).await
    }

    /// Soft delete: archives the row, nothing is physically removed.
    pub async fn remove(&self, entity_id: &str, row_id: &str) -> ApiResult<Value> {
        debug!(entity_id, row_id, "archiving row");
        self.update(entity_id, row_id, &json!({ ARCHIVED_FLAG: true })).await
    }

    // ----- metadata -----

    pub async fn get_entity_properties(&self, entity_id: &str) -> ApiResult<Vec<PropertyMetadata>> {
        let entry = self.metadata.resolve(&self.tenant_id, entity_id).await?;
        Ok(entry.properties.clone())
    }

    /// Display label for an enum value; never fails, unknown values come back unchanged.
    pub async fn get_enum_label(&self, entity_id: &str, property_id: &str, value: &Value) -> Value {
        self.metadata
            .resolve_enum_label(&self.tenant_id, entity_id, property_id, value)
            .await
    }

    /// Enum label for a value given as text. The text is tried as JSON first
    /// (numbers, null, quoted strings), then as a plain string.
    pub async fn get_enum_label_from_str(&self, entity_id: &str, property_id: &str, raw: &str) -> Value {
        let text = Value::String(raw.to_owned());
        let parsed = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| text.clone());
        let label = self.get_enum_label(entity_id, property_id, &parsed).await;
        if label == parsed && parsed != text {
            return self.get_enum_label(entity_id, property_id, &text).await;
        }
        label
    }

    pub async fn invalidate_metadata(&self) {
        self.metadata.invalidate(&self.tenant_id).await;
    }

    // ----- auth -----

    pub async fn get_login_options(&self) -> Vec<String> {
        self.sync_login_options().await;
        self.tokens().login_options().await
    }

    pub async fn login(&self, provider_id: &str) -> ApiResult<()> {
        self.sync_login_options().await;
        self.tokens().login(provider_id).await.map_err(ApiError::from)
    }

    pub async fn sign_out(&self) -> ApiResult<()> {
        self.tokens().sign_out().await.map_err(ApiError::from)
    }

    async fn list_rows(&self, entity_id: &str, query: Option<&Query>) -> ApiResult<Value> {
        let api_id = self.api_id(entity_id).await?;
        let route = EntityRoute::collection(&api_id, &self.tenant_id, entity_id).to_string();
        match query {
            Some(query) => self.transport.get_with_query(&route, query).await,
            None => self.transport.get(&route).await,
        }
    }

    async fn get_row(&self, entity_id: &str, row_id: &str) -> ApiResult<Value> {
        let api_id = self.api_id(entity_id).await?;
        let route = EntityRoute::collection(&api_id, &self.tenant_id, entity_id).row(row_id);
        self.transport.get(&route.to_string()).await
    }

    async fn api_id(&self, entity_id: &str) -> ApiResult<String> {
        let entry = self.metadata.resolve(&self.tenant_id, entity_id).await?;
        Ok(entry.api_id.clone())
    }

    /// Loaded tenant metadata that lists login providers decides which are enabled.
    async fn sync_login_options(&self) {
        if self.tokens().provider().as_interactive().is_none()
            || !self.metadata.is_loaded(&self.tenant_id).await
        {
            return;
        }
        match self.metadata.ensure_loaded(&self.tenant_id).await {
            Ok(metadata) if !metadata.login_providers.is_empty() => {
                self.tokens().set_login_options(&metadata.login_providers).await;
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "login options kept, tenant metadata unavailable"),
        }
    }
}

fn build_http_client(cfg: &ClientConfig) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_millis(cfg.http.timeout_ms))
        .build()?)
}
