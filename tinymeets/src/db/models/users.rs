//! Database models for users.

use crate::db::models::roles::RoleSummary;
use crate::types::{RoleId, UserId};
use chrono::{DateTime, Utc};

/// Database request for creating a new user
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub email: String,
    pub username: String,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    /// "native", "proxy-header", "system" or "test"
    pub auth_source: String,
    /// Role names to grant, e.g. `["user"]`
    pub roles: Vec<String>,
}

/// Database request for updating a user
#[derive(Debug, Clone, Default)]
pub struct UserUpdateDBRequest {
    pub name: Option<String>,
    pub password_hash: Option<String>,
    /// Replaces every role the user holds when set
    pub role_ids: Option<Vec<RoleId>>,
}

/// Database response for a user
#[derive(Debug, Clone)]
pub struct UserDBResponse {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub auth_source: String,
    pub roles: Vec<RoleSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserDBResponse {
    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.name == name)
    }
}
