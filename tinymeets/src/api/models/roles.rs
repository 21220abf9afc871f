//! API response models for roles.

use crate::db::models::roles::{RoleDBResponse, RoleSummary};
use crate::types::{PermissionString, RoleId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RoleSummaryResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: RoleId,
    pub name: String,
}

impl From<RoleSummary> for RoleSummaryResponse {
    fn from(db: RoleSummary) -> Self {
        Self { id: db.id, name: db.name }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: RoleId,
    pub name: String,
    pub description: String,
    /// `action:entity:access` strings granted by the role
    #[schema(value_type = Vec<String>, example = json!(["read:location:any"]))]
    pub permissions: Vec<PermissionString>,
}

impl From<RoleDBResponse> for RoleResponse {
    fn from(db: RoleDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            description: db.description,
            permissions: db.permissions,
        }
    }
}
