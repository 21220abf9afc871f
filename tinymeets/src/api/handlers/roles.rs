use crate::{
    AppState,
    api::models::roles::RoleResponse,
    auth::permissions::{RequiresPermission, operation, resource},
    db::handlers::Roles,
    errors::{Error, Result},
};
use axum::{Json, extract::State};

#[utoipa::path(
    get,
    path = "/admin/roles",
    tag = "users",
    summary = "List roles",
    responses(
        (status = 200, description = "Every role with its permission strings", body = Vec<RoleResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(
        ("CookieAuth" = []),
        ("ProxyHeader" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_roles(
    State(state): State<AppState>,
    _: RequiresPermission<resource::Users, operation::ReadAll>,
) -> Result<Json<Vec<RoleResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let roles = Roles::new(&mut conn).list().await?;
    Ok(Json(roles.into_iter().map(RoleResponse::from).collect()))
}
