/// Metadata cache
///
/// Holds one lazily loaded schema per tenant. Concurrent first accesses for
/// a tenant wait on the same `OnceCell`, so the metadata endpoint is hit
/// once; a failed load leaves the cell empty for the next caller to retry.
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, error, info, warn};

use crate::auth::portal::LoginProvider;
use crate::error::{ApiError, ApiResult};
use crate::metadata::models::{EntityMetadataEntry, PropertyMetadata, TenantMetaResponse};
use crate::observability::metrics::get_metrics;
use crate::transport::http::Transport;

pub fn tenant_meta_path(tenant_id: &str) -> String {
    format!("/xrm-tenants/v1/tenants/{}/tenantMeta", tenant_id)
}

/// One tenant's schema, keyed by the server's canonical entity id
#[derive(Debug, Clone, Default)]
pub struct TenantMetadata {
    pub entities: HashMap<String, Arc<EntityMetadataEntry>>,
    pub login_providers: Vec<LoginProvider>,
}

impl From<TenantMetaResponse> for TenantMetadata {
    fn from(raw: TenantMetaResponse) -> Self {
        let entities = raw
            .entities_meta
            .into_iter()
            .map(|entity| {
                let entry = EntityMetadataEntry {
                    id: entity.id.clone(),
                    api_id: entity.api_id,
                    properties: entity
                        .properties
                        .unwrap_or_default()
                        .into_iter()
                        .map(PropertyMetadata::from)
                        .collect(),
                };
                (entity.id, Arc::new(entry))
            })
            .collect();
        Self { entities, login_providers: raw.login_providers }
    }
}

impl TenantMetadata {
    pub fn entity(&self, entity_id: &str) -> Option<&Arc<EntityMetadataEntry>> {
        self.entities.get(entity_id)
    }
}

type TenantSlot = Arc<OnceCell<Arc<TenantMetadata>>>;

#[derive(Debug)]
pub struct MetadataCache {
    transport: Arc<Transport>,
    tenants: RwLock<HashMap<String, TenantSlot>>,
}

impl MetadataCache {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport, tenants: RwLock::new(HashMap::new()) }
    }

    /// Loads the tenant schema once; later and concurrent callers share the result.
    pub async fn ensure_loaded(&self, tenant_id: &str) -> ApiResult<Arc<TenantMetadata>> {
        let slot = self.slot(tenant_id).await;
        let metadata = slot.get_or_try_init(|| self.load(tenant_id)).await?;
        Ok(metadata.clone())
    }

    pub async fn is_loaded(&self, tenant_id: &str) -> bool {
        self.tenants
            .read()
            .await
            .get(tenant_id)
            .is_some_and(|slot| slot.initialized())
    }

    /// Drops the tenant schema; the next access reloads it.
    pub async fn invalidate(&self, tenant_id: &str) {
        if self.tenants.write().await.remove(tenant_id).is_some() {
            info!(tenant_id, "tenant metadata invalidated");
        }
    }

    pub async fn resolve(&self, tenant_id: &str, entity_id: &str) -> ApiResult<Arc<EntityMetadataEntry>> {
        self.ensure_loaded(tenant_id)
            .await?
            .entity(entity_id)
            .cloned()
            .ok_or_else(|| ApiError::entity_not_found(entity_id))
    }

    pub async fn resolve_property(
        &self,
        tenant_id: &str,
        entity_id: &str,
        property_id: &str,
    ) -> ApiResult<PropertyMetadata> {
        self.resolve(tenant_id, entity_id)
            .await?
            .property(property_id)
            .cloned()
            .ok_or_else(|| {
                ApiError::new(404, format!("Property {} not found for entity {}", property_id, entity_id))
            })
    }

    /// Label of the enum option matching `value`, or `value` itself when the
    /// entity, property or option is unknown.
    pub async fn resolve_enum_label(
        &self,
        tenant_id: &str,
        entity_id: &str,
        property_id: &str,
        value: &Value,
    ) -> Value {
        let property = match self.resolve_property(tenant_id, entity_id, property_id).await {
            Ok(property) => property,
            Err(e) => {
                warn!(entity_id, property_id, error = %e, "enum label lookup fell back to value");
                return value.clone();
            }
        };
        if property.enum_options.is_none() {
            warn!(entity_id, property_id, "Property {} is not an enum", property_id);
            return value.clone();
        }
        match property.enum_option(value) {
            Some(option) => Value::String(option.label.clone()),
            None => {
                warn!(entity_id, property_id, "Enum option {} not found for property {}", value, property_id);
                value.clone()
            }
        }
    }

    async fn slot(&self, tenant_id: &str) -> TenantSlot {
        if let Some(slot) = self.tenants.read().await.get(tenant_id) {
            return slot.clone();
        }
        self.tenants
            .write()
            .await
            .entry(tenant_id.to_owned())
            .or_default()
            .clone()
    }

    async fn load(&self, tenant_id: &str) -> ApiResult<Arc<TenantMetadata>> {
        let metrics = get_metrics().await;
        debug!(tenant_id, "loading tenant metadata");

        let loaded = self
            .transport
            .get(&tenant_meta_path(tenant_id))
            .await
            .and_then(|body| {
                serde_json::from_value::<TenantMetaResponse>(body)
                    .map_err(|e| ApiError::new(502, format!("invalid tenant metadata: {}", e)))
            });

        match loaded {
            Ok(raw) => {
                let metadata = TenantMetadata::from(raw);
                metrics.metadata_loads.with_label_values(&[tenant_id, "ok"]).inc();
                info!(tenant_id, entities = metadata.entities.len(), "tenant metadata loaded");
                Ok(Arc::new(metadata))
            }
            Err(e) => {
                metrics.metadata_loads.with_label_values(&[tenant_id, "error"]).inc();
                error!(tenant_id, error = %e, "tenant metadata load failed");
                Err(e)
            }
        }
    }
}
