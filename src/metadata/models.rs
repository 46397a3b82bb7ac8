use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::portal::LoginProvider;

/// ================================
/// Tenant metadata as served
/// ================================
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantMetaResponse {
    pub entities_meta: Vec<EntityMetaRaw>,
    #[serde(default)]
    pub login_providers: Vec<LoginProvider>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMetaRaw {
    pub id: String,
    pub api_id: String,
    #[serde(default)]
    pub properties: Option<Vec<PropertyMetaRaw>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyMetaRaw {
    pub id: String,
    pub name: Option<String>,
    pub data_type_id: Option<String>,
    pub json_base_type: Option<String>,
    pub is_required: Option<bool>,
    pub foreign_key: Option<ForeignKeyRaw>,
    pub default_value: Option<Value>,
    pub enum_options: Option<Vec<EnumOption>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyRaw {
    pub fk_type: Option<String>,
    pub foreign_entity_type: String,
    pub foreign_property_id: String,
    pub local_property_id: Option<String>,
    #[serde(default)]
    pub foreign_fields: Vec<ForeignField>,
    #[serde(default)]
    pub auto_row_rels: Vec<AutoRowRel>,
    pub always_include_get: Option<bool>,
}

/// ================================
/// Normalized metadata
/// ================================
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMetadataEntry {
    pub id: String,
    pub api_id: String,
    pub properties: Vec<PropertyMetadata>,
}

impl EntityMetadataEntry {
    pub fn property(&self, property_id: &str) -> Option<&PropertyMetadata> {
        self.properties.iter().find(|p| p.id == property_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyMetadata {
    pub id: String,
    pub name: String,
    pub data_type_id: String,
    pub json_base_type: String,
    pub is_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_options: Option<Vec<EnumOption>>,
}

impl PropertyMetadata {
    pub fn enum_option(&self, value: &Value) -> Option<&EnumOption> {
        self.enum_options.as_ref()?.iter().find(|option| &option.value == value)
    }
}

impl From<PropertyMetaRaw> for PropertyMetadata {
    fn from(raw: PropertyMetaRaw) -> Self {
        Self {
            id: raw.id,
            name: raw.name.unwrap_or_default(),
            data_type_id: raw.data_type_id.unwrap_or_default(),
            json_base_type: raw.json_base_type.unwrap_or_default(),
            is_required: raw.is_required.unwrap_or(false),
            foreign_key: raw.foreign_key.map(ForeignKey::from),
            // `Option<Value>` reads JSON null as absent
            default_value: raw.default_value,
            enum_options: raw.enum_options,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fk_type: Option<String>,
    pub foreign_entity_type: String,
    pub foreign_property_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_property_id: Option<String>,
    pub foreign_fields: Vec<ForeignField>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub auto_row_rels: Vec<AutoRowRel>,
    pub always_include_get: bool,
}

impl From<ForeignKeyRaw> for ForeignKey {
    fn from(raw: ForeignKeyRaw) -> Self {
        Self {
            fk_type: raw.fk_type,
            foreign_entity_type: raw.foreign_entity_type,
            foreign_property_id: raw.foreign_property_id,
            local_property_id: raw.local_property_id,
            foreign_fields: raw.foreign_fields,
            auto_row_rels: raw.auto_row_rels,
            always_include_get: raw.always_include_get.unwrap_or(false),
        }
    }
}

/// Field mapping applied when joining a foreign row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignField {
    pub src: String,
    /// output key, may be a dotted path
    pub dst: String,
    #[serde(default)]
    pub store_local: bool,
    #[serde(default)]
    pub allow_local_override: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoRowRel {
    pub rtyp: String,
    #[serde(default)]
    pub no_push: bool,
    #[serde(default)]
    pub no_pull: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumOption {
    /// string, number or null
    #[serde(default)]
    pub value: Value,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behaviors: Option<Vec<String>>,
}

/// ================================
/// Associations
/// ================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AssociationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_row_rels: Option<Vec<RowRel>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub del_row_rels: Option<Vec<RowRel>>,
}

/// One relationship edge: entity type, entity row id, relation type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRel {
    pub etyp: String,
    pub erid: String,
    pub rtyp: String,
}
