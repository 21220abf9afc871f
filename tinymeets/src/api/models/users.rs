//! API request/response models for users.

use super::{pagination::Pagination, roles::RoleSummaryResponse};
use crate::db::models::users::UserDBResponse;
use crate::types::{PermissionString, RoleId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// The authenticated user making a request.
///
/// Roles and permissions are resolved from the database for every request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub name: Option<String>,
    /// Role names, e.g. `["user"]`
    pub roles: Vec<String>,
    /// Every permission granted by the user's roles, deduplicated
    #[schema(value_type = Vec<String>, example = json!(["create:meetup:own", "read:meetup:own"]))]
    pub permissions: Vec<PermissionString>,
}

impl CurrentUser {
    pub fn from_db(user: UserDBResponse, permissions: Vec<PermissionString>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            name: user.name,
            roles: user.roles.into_iter().map(|r| r.name).collect(),
            permissions,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub name: Option<String>,
    pub roles: Vec<RoleSummaryResponse>,
    pub created_at: DateTime<Utc>,
}

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            email: db.email,
            username: db.username,
            name: db.name,
            roles: db.roles.into_iter().map(Into::into).collect(),
            created_at: db.created_at,
        }
    }
}

/// Public view of a user who owns or attends a meetup
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OwnerSummary {
    pub username: String,
    pub name: Option<String>,
}

impl From<&UserDBResponse> for OwnerSummary {
    fn from(db: &UserDBResponse) -> Self {
        Self {
            username: db.username.clone(),
            name: db.name.clone(),
        }
    }
}

/// Query parameters for listing users
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListUsersQuery {
    /// Pagination parameters
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive substring match on email, username or name
    pub search: Option<String>,
}

/// Replace a user's roles
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserRolesUpdate {
    #[schema(value_type = Vec<String>, format = "uuid")]
    pub role_ids: Vec<RoleId>,
}
