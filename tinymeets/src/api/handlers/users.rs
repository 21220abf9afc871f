use crate::{
    AppState,
    api::models::{
        pagination::PaginatedResponse,
        users::{CurrentUser, ListUsersQuery, UserResponse, UserRolesUpdate},
    },
    auth::permissions::{RequiresPermission, operation, resource},
    db::{
        handlers::{Repository, Roles, Users, users::UserFilter},
        models::users::UserUpdateDBRequest,
    },
    errors::{Error, Result},
    types::UserId,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};

/// Get the authenticated user
#[utoipa::path(
    get,
    path = "/users/current",
    tag = "users",
    summary = "Get current user",
    responses(
        (status = 200, description = "The current user with roles and permissions", body = CurrentUser),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("CookieAuth" = []),
        ("ProxyHeader" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_current_user(current_user: CurrentUser) -> Json<CurrentUser> {
    Json(current_user)
}

#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "users",
    summary = "List users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Paginated list of users", body = PaginatedResponse<UserResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(
        ("CookieAuth" = []),
        ("ProxyHeader" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
    _: RequiresPermission<resource::Users, operation::ReadAll>,
) -> Result<Json<PaginatedResponse<UserResponse>>> {
    let (skip, limit) = query.pagination.params();
    let filter = UserFilter::new(skip, limit).with_search(query.search);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);
    let users = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        users.into_iter().map(UserResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

#[utoipa::path(
    put,
    path = "/admin/users/{user_id}/roles",
    tag = "users",
    summary = "Replace a user's roles",
    request_body = UserRolesUpdate,
    params(
        ("user_id" = uuid::Uuid, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "The updated user", body = UserResponse),
        (status = 400, description = "Unknown role id"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found"),
    ),
    security(
        ("CookieAuth" = []),
        ("ProxyHeader" = [])
    )
)]
#[tracing::instrument(skip_all, fields(user_id = %user_id))]
pub async fn update_user_roles(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    _: RequiresPermission<resource::Users, operation::UpdateAll>,
    Json(request): Json<UserRolesUpdate>,
) -> Result<Json<UserResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    if Users::new(&mut tx).get_by_id(user_id).await?.is_none() {
        return Err(Error::NotFound {
            resource: "User".to_string(),
            id: user_id.to_string(),
        });
    }

    let known = Roles::new(&mut tx).get_bulk(&request.role_ids).await?;
    if let Some(unknown) = request.role_ids.iter().find(|id| !known.contains_key(id)) {
        return Err(Error::BadRequest {
            message: format!("Unknown role id {unknown}"),
        });
    }

    let user = Users::new(&mut tx)
        .update(
            user_id,
            &UserUpdateDBRequest {
                role_ids: Some(request.role_ids),
                ..Default::default()
            },
        )
        .await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(UserResponse::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::roles::names;
    use crate::test_utils::{add_auth_headers, create_test_admin_user, create_test_app, create_test_user};
    use axum::http::StatusCode;
    use sqlx::SqlitePool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_current_user(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, names::USER).await;
        let (header, value) = &add_auth_headers(&user)[0];

        let response = server.get("/api/v1/users/current").add_header(header, value).await;
        response.assert_status_ok();
        let current: CurrentUser = response.json();
        assert_eq!(current.id, user.id);
        assert_eq!(current.roles, vec!["user".to_string()]);
        assert!(current.permissions.iter().any(|p| p.to_string() == "create:meetup:own"));

        server.get("/api/v1/users/current").await.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_users_requires_admin(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, names::USER).await;
        let admin = create_test_admin_user(&pool).await;

        let (header, value) = &add_auth_headers(&user)[0];
        server
            .get("/api/v1/admin/users")
            .add_header(header, value)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let (header, value) = &add_auth_headers(&admin)[0];
        let response = server
            .get("/api/v1/admin/users")
            .add_query_param("search", &user.username)
            .add_header(header, value)
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["total_count"], 1);
        assert_eq!(body["data"][0]["username"], user.username.as_str());
        assert_eq!(body["data"][0]["roles"][0]["name"], "user");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_user_roles(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, names::USER).await;
        let admin = create_test_admin_user(&pool).await;
        let (header, value) = &add_auth_headers(&admin)[0];

        let (admin_role, user_role) = {
            let mut conn = pool.acquire().await.unwrap();
            let mut roles = Roles::new(&mut conn);
            (
                roles.get_by_name(names::ADMIN).await.unwrap().unwrap(),
                roles.get_by_name(names::USER).await.unwrap().unwrap(),
            )
        };

        let response = server
            .put(&format!("/api/v1/admin/users/{}/roles", user.id))
            .add_header(header, value)
            .json(&UserRolesUpdate {
                role_ids: vec![admin_role.id, user_role.id],
            })
            .await;
        response.assert_status_ok();
        let updated: UserResponse = response.json();
        let role_names: Vec<_> = updated.roles.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(role_names, vec!["admin", "user"]);

        let response = server
            .put(&format!("/api/v1/admin/users/{}/roles", user.id))
            .add_header(header, value)
            .json(&UserRolesUpdate {
                role_ids: vec![uuid::Uuid::new_v4()],
            })
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = server
            .put(&format!("/api/v1/admin/users/{}/roles", uuid::Uuid::new_v4()))
            .add_header(header, value)
            .json(&UserRolesUpdate {
                role_ids: vec![user_role.id],
            })
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.text(), "User not found");
    }
}
