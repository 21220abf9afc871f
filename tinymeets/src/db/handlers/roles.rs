//! Database repository for roles.
//!
//! Roles and their permissions are seeded by migrations and only read at runtime, so this is not
//! a full [`Repository`](super::Repository).

use crate::db::{
    errors::{DbError, Result},
    models::roles::RoleDBResponse,
};
use crate::types::{PermissionString, RoleId};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;
use tracing::instrument;

/// Role names referenced by the application
pub mod names {
    /// Manages locations, users and every meetup
    pub const ADMIN: &str = "admin";
    /// Default role for anyone who signs up
    pub const USER: &str = "user";
}

#[derive(Debug, Clone, FromRow)]
struct Role {
    id: RoleId,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct RolePermissionRow {
    role_id: RoleId,
    action: String,
    entity: String,
    access: String,
}

pub struct Roles<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Roles<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// All roles ordered by name, with their permissions
    #[instrument(skip(self), err)]
    pub async fn list(&mut self) -> Result<Vec<RoleDBResponse>> {
        let roles = sqlx::query_as::<_, Role>("SELECT id, name, description, created_at, updated_at FROM roles ORDER BY name")
            .fetch_all(&mut *self.db)
            .await?;
        self.with_permissions(roles).await
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_name(&mut self, name: &str) -> Result<Option<RoleDBResponse>> {
        let role = sqlx::query_as::<_, Role>("SELECT id, name, description, created_at, updated_at FROM roles WHERE name = ?")
            .bind(name)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(self.with_permissions(role.into_iter().collect()).await?.pop())
    }

    /// Roles for the given ids, keyed by id. Unknown ids are simply absent.
    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    pub async fn get_bulk(&mut self, ids: &[RoleId]) -> Result<HashMap<RoleId, RoleDBResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new("SELECT id, name, description, created_at, updated_at FROM roles WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        let roles = query.build_query_as::<Role>().fetch_all(&mut *self.db).await?;

        Ok(self.with_permissions(roles).await?.into_iter().map(|r| (r.id, r)).collect())
    }

    async fn with_permissions(&mut self, roles: Vec<Role>) -> Result<Vec<RoleDBResponse>> {
        if roles.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT rp.role_id, p.action, p.entity, p.access
             FROM role_permissions rp JOIN permissions p ON p.id = rp.permission_id
             WHERE rp.role_id IN (",
        );
        let mut separated = query.separated(", ");
        for role in &roles {
            separated.push_bind(role.id);
        }
        separated.push_unseparated(") ORDER BY p.entity, p.action, p.access");
        let rows = query.build_query_as::<RolePermissionRow>().fetch_all(&mut *self.db).await?;

        let mut permissions: HashMap<RoleId, Vec<PermissionString>> = HashMap::new();
        for row in rows {
            let permission =
                PermissionString::from_parts(&row.action, &row.entity, &row.access).map_err(|e| DbError::Other(e.into()))?;
            permissions.entry(row.role_id).or_default().push(permission);
        }

        Ok(roles
            .into_iter()
            .map(|role| RoleDBResponse {
                permissions: permissions.remove(&role.id).unwrap_or_default(),
                id: role.id,
                name: role.name,
                description: role.description,
                created_at: role.created_at,
                updated_at: role.updated_at,
            })
            .collect())
    }
}
