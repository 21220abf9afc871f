//! Database repository for users.

use crate::types::{PermissionString, UserId, abbrev_uuid};
use crate::db::{
    errors::{DbError, Result},
    handlers::{repository::Repository, substring_pattern},
    models::{
        roles::RoleSummary,
        users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
    },
};
use chrono::{DateTime, Utc};
use sqlx::{Connection, FromRow, QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing users
#[derive(Debug, Clone)]
pub struct UserFilter {
    pub skip: i64,
    pub limit: i64,
    /// Case-insensitive substring match on email, username or name
    pub search: Option<String>,
}

impl UserFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit, search: None }
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search.filter(|s| !s.trim().is_empty());
        self
    }

    fn push_conditions<'a>(&'a self, query: &mut QueryBuilder<'a, Sqlite>) {
        query.push(" WHERE 1 = 1");
        if let Some(search) = &self.search {
            let pattern = substring_pattern(search);
            query
                .push(" AND (lower(email) LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR lower(username) LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR lower(COALESCE(name, '')) LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
    }
}

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub auth_source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct UserRoleRow {
    user_id: UserId,
    id: Uuid,
    name: String,
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    action: String,
    entity: String,
    access: String,
}

const USER_COLUMNS: &str = "id, email, username, name, password_hash, auth_source, created_at, updated_at";

pub struct Users<'c> {
    db: &'c mut SqliteConnection,
}

impl From<(Vec<RoleSummary>, User)> for UserDBResponse {
    fn from((roles, user): (Vec<RoleSummary>, User)) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            name: user.name,
            password_hash: user.password_hash,
            auth_source: user.auth_source,
            roles,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Roles for each of `user_ids`, ordered by role name
async fn roles_for_users(conn: &mut SqliteConnection, user_ids: &[UserId]) -> Result<HashMap<UserId, Vec<RoleSummary>>> {
    let mut result: HashMap<UserId, Vec<RoleSummary>> = HashMap::new();
    if user_ids.is_empty() {
        return Ok(result);
    }

    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT ur.user_id, r.id, r.name FROM user_roles ur JOIN roles r ON r.id = ur.role_id WHERE ur.user_id IN (",
    );
    let mut separated = query.separated(", ");
    for id in user_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY r.name");

    let rows = query.build_query_as::<UserRoleRow>().fetch_all(&mut *conn).await?;
    for row in rows {
        result
            .entry(row.user_id)
            .or_default()
            .push(RoleSummary { id: row.id, name: row.name });
    }
    Ok(result)
}

#[async_trait::async_trait]
impl<'c> Repository for Users<'c> {
    type CreateRequest = UserCreateDBRequest;
    type UpdateRequest = UserUpdateDBRequest;
    type Response = UserDBResponse;
    type Id = UserId;
    type Filter = UserFilter;

    #[instrument(skip(self, request), fields(username = %request.username), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        // Always generate a new ID for users
        let user_id = Uuid::new_v4();
        let now = Utc::now();

        let mut tx = self.db.begin().await?;
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, email, username, name, password_hash, auth_source, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&request.email)
        .bind(&request.username)
        .bind(&request.name)
        .bind(&request.password_hash)
        .bind(&request.auth_source)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        for role in &request.roles {
            let inserted = sqlx::query("INSERT INTO user_roles (user_id, role_id) SELECT ?, id FROM roles WHERE name = ?")
                .bind(user_id)
                .bind(role)
                .execute(&mut *tx)
                .await?;
            if inserted.rows_affected() == 0 {
                return Err(DbError::ForeignKeyViolation {
                    constraint: Some("user_roles.role_id".to_string()),
                    table: Some("user_roles".to_string()),
                    message: format!("role '{role}' does not exist"),
                });
            }
        }

        let roles = roles_for_users(&mut tx, &[user_id]).await?.remove(&user_id).unwrap_or_default();
        tx.commit().await?;

        Ok(UserDBResponse::from((roles, user)))
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        match user {
            Some(user) => {
                let roles = roles_for_users(&mut *self.db, &[id]).await?.remove(&id).unwrap_or_default();
                Ok(Some(UserDBResponse::from((roles, user))))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<UserId>) -> Result<HashMap<Self::Id, UserDBResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {USER_COLUMNS} FROM users WHERE id IN ("));
        let mut separated = query.separated(", ");
        for id in &ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        let users = query.build_query_as::<User>().fetch_all(&mut *self.db).await?;

        let mut roles = roles_for_users(&mut *self.db, &ids).await?;
        Ok(users
            .into_iter()
            .map(|user| {
                let user_roles = roles.remove(&user.id).unwrap_or_default();
                (user.id, UserDBResponse::from((user_roles, user)))
            })
            .collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        filter.push_conditions(&mut query);
        query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.skip);

        let users = query.build_query_as::<User>().fetch_all(&mut *self.db).await?;

        let ids: Vec<UserId> = users.iter().map(|u| u.id).collect();
        let mut roles = roles_for_users(&mut *self.db, &ids).await?;
        Ok(users
            .into_iter()
            .map(|user| {
                let user_roles = roles.remove(&user.id).unwrap_or_default();
                UserDBResponse::from((user_roles, user))
            })
            .collect())
    }

    #[instrument(skip(self, filter), err)]
    async fn count(&mut self, filter: &Self::Filter) -> Result<i64> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM users");
        filter.push_conditions(&mut query);
        let count: i64 = query.build_query_scalar::<i64>().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        // Touches users and user_roles, so always run in a transaction
        let mut tx = self.db.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET
                name = COALESCE(?, name),
                password_hash = COALESCE(?, password_hash),
                updated_at = ?
             WHERE id = ?
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&request.name)
        .bind(&request.password_hash)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;

        if let Some(role_ids) = &request.role_ids {
            sqlx::query("DELETE FROM user_roles WHERE user_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            for role_id in role_ids {
                sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, role_id) VALUES (?, ?)")
                    .bind(id)
                    .bind(role_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        let roles = roles_for_users(&mut tx, &[id]).await?.remove(&id).unwrap_or_default();
        tx.commit().await?;

        Ok(UserDBResponse::from((roles, user)))
    }
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, email), err)]
    pub async fn get_user_by_email(&mut self, email: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(&mut *self.db)
            .await?;

        match user {
            Some(user) => {
                let id = user.id;
                let roles = roles_for_users(&mut *self.db, &[id]).await?.remove(&id).unwrap_or_default();
                Ok(Some(UserDBResponse::from((roles, user))))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self), err)]
    pub async fn get_user_by_username(&mut self, username: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?"))
            .bind(username)
            .fetch_optional(&mut *self.db)
            .await?;

        match user {
            Some(user) => {
                let id = user.id;
                let roles = roles_for_users(&mut *self.db, &[id]).await?.remove(&id).unwrap_or_default();
                Ok(Some(UserDBResponse::from((roles, user))))
            }
            None => Ok(None),
        }
    }

    /// Every permission granted through any of the user's roles, deduplicated
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    pub async fn get_permissions(&mut self, id: UserId) -> Result<Vec<PermissionString>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            "SELECT DISTINCT p.action, p.entity, p.access
             FROM user_roles ur
             JOIN role_permissions rp ON rp.role_id = ur.role_id
             JOIN permissions p ON p.id = rp.permission_id
             WHERE ur.user_id = ?
             ORDER BY p.entity, p.action, p.access",
        )
        .bind(id)
        .fetch_all(&mut *self.db)
        .await?;

        rows.into_iter()
            .map(|row| {
                PermissionString::from_parts(&row.action, &row.entity, &row.access).map_err(|e| DbError::Other(e.into()))
            })
            .collect()
    }
}
