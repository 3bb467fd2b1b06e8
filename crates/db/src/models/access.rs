//! Roles and the permissions they grant.

use optique_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// A role together with how many permissions it currently holds.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Role {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub permission_count: i64,
}

/// One `(resource, action)` entry of the permission catalogue.
///
/// Rows are seeded by migration; the API only changes which roles hold them.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Permission {
    pub id: DbId,
    pub resource: String,
    pub action: String,
    pub description: Option<String>,
}

impl Permission {
    /// `resource:action`, the form sent to clients.
    pub fn key(&self) -> String {
        format!("{}:{}", self.resource, self.action)
    }
}
