//! Database models for roles and their permissions.

use crate::types::{PermissionString, RoleId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// A role reference as attached to a user
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RoleSummary {
    pub id: RoleId,
    pub name: String,
}

/// Database response for a role
#[derive(Debug, Clone)]
pub struct RoleDBResponse {
    pub id: RoleId,
    pub name: String,
    pub description: String,
    pub permissions: Vec<PermissionString>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
