use std::collections::BTreeMap;
use std::fmt;

/// List filters, sent as query parameters in key order
pub type Query = BTreeMap<String, String>;

pub const ARCHIVED_FLAG: &str = "isArchived";

/// `/{apiId}/tenants/{tenantId}/{entityId}[/{rowId}][/associations]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRoute<'a> {
    api_id: &'a str,
    tenant_id: &'a str,
    entity_id: &'a str,
    row_id: Option<&'a str>,
    associations: bool,
}

impl<'a> EntityRoute<'a> {
    pub fn collection(api_id: &'a str, tenant_id: &'a str, entity_id: &'a str) -> Self {
        Self { api_id, tenant_id, entity_id, row_id: None, associations: false }
    }

    pub fn row(mut self, row_id: &'a str) -> Self {
        self.row_id = Some(row_id);
        self
    }

    pub fn associations(mut self) -> Self {
        self.associations = true;
        self
    }
}

impl fmt::Display for EntityRoute<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/tenants/{}/{}", self.api_id, self.tenant_id, self.entity_id)?;
        if let Some(row_id) = self.row_id {
            write!(f, "/{}", row_id)?;
        }
        if self.associations {
            f.write_str("/associations")?;
        }
        Ok(())
    }
}
