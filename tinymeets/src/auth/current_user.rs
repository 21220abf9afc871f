use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::session,
    config::Config,
    db::{
        errors::DbError,
        handlers::{Repository, Users, roles::names},
        models::users::{UserCreateDBRequest, UserDBResponse},
    },
    errors::{Error, Result},
    types::UserId,
};
use axum::{extract::FromRequestParts, http::request::Parts};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, instrument, trace};

/// Build the request's user from a database record, loading permissions from their roles
pub async fn load_current_user(conn: &mut SqliteConnection, user: UserDBResponse) -> Result<CurrentUser> {
    let permissions = Users::new(conn).get_permissions(user.id).await?;
    Ok(CurrentUser::from_db(user, permissions))
}

/// Find the user id in the JWT session cookie, if there is one.
/// Returns:
/// - None: No session cookie present
/// - Some(Ok(id)): Valid token found and verified
/// - Some(Err(error)): Cookie present but invalid, expired or malformed
#[instrument(skip(parts, config))]
fn try_jwt_session_auth(parts: &Parts, config: &Config) -> Option<Result<UserId>> {
    let cookie_header = parts.headers.get(axum::http::header::COOKIE)?;

    let cookie_str = match cookie_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid cookie header: {e}"),
            }));
        }
    };
    let cookie_name = &config.auth.native.session.cookie_name;

    let mut last_error = None;
    for cookie in cookie_str.split(';') {
        let Some((name, value)) = cookie.trim().split_once('=') else {
            continue;
        };
        if name != cookie_name {
            continue;
        }
        match session::verify_session_token(value, config) {
            Ok(claims) => return Some(Ok(claims.sub)),
            Err(e) => last_error = Some(e),
        }
    }
    last_error.map(Err)
}

#[instrument(skip(db))]
async fn session_user(db: &SqlitePool, user_id: UserId) -> Result<CurrentUser> {
    let mut conn = db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn)
        .get_by_id(user_id)
        .await?
        // The account was deleted after the token was issued
        .ok_or(Error::Unauthenticated { message: None })?;
    load_current_user(&mut conn, user).await
}

/// Username for an auto-created proxy user: the email's local part
fn username_from_email(email: &str) -> String {
    match email.split('@').next() {
        Some(local) if !local.is_empty() => local.to_string(),
        _ => "user".to_string(),
    }
}

/// Extract user from the trusted proxy header if present
/// Returns:
/// - None: No proxy header present, or the user is unknown and auto-creation is off
/// - Some(Ok(user)): User found or created
/// - Some(Err(error)): Lookup or creation failed
#[instrument(skip(parts, config, db))]
async fn try_proxy_header_auth(parts: &Parts, config: &Config, db: &SqlitePool) -> Option<Result<CurrentUser>> {
    let user_email = parts
        .headers
        .get(&config.auth.proxy_header.header_name)
        .and_then(|h| h.to_str().ok())?
        .trim();
    if user_email.is_empty() {
        return None;
    }

    let mut conn = match db.acquire().await {
        Ok(conn) => conn,
        Err(e) => return Some(Err(DbError::from(e).into())),
    };

    let existing = match Users::new(&mut conn).get_user_by_email(user_email).await {
        Ok(user) => user,
        Err(e) => return Some(Err(Error::Database(e))),
    };

    let user = match existing {
        Some(user) => user,
        None if config.auth.proxy_header.auto_create_users => {
            let mut username = username_from_email(user_email);
            // Fall back to the whole email when the local part is taken
            match Users::new(&mut conn).get_user_by_username(&username).await {
                Ok(Some(_)) => username = user_email.to_string(),
                Ok(None) => {}
                Err(e) => return Some(Err(Error::Database(e))),
            }

            let create_request = UserCreateDBRequest {
                email: user_email.to_string(),
                username,
                name: None,
                password_hash: None,
                auth_source: "proxy-header".to_string(),
                roles: vec![names::USER.to_string()],
            };
            match Users::new(&mut conn).create(&create_request).await {
                Ok(user) => user,
                Err(e) => return Some(Err(Error::Database(e))),
            }
        }
        None => return None,
    };

    Some(load_current_user(&mut conn, user).await)
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        // Each method returns Option<Result<_>>:
        // - None means the method is not applicable (no credentials present)
        // - Some(Ok(_)) means successful authentication
        // - Some(Err(_)) means credentials were present but invalid
        // The first success wins; failures only matter if nothing else succeeds.
        let mut auth_errors = Vec::new();

        if state.config.auth.native.enabled {
            match try_jwt_session_auth(parts, &state.config) {
                Some(Ok(user_id)) => match session_user(&state.db, user_id).await {
                    Ok(user) => {
                        debug!("Found JWT session authenticated user: {}", user.id);
                        return Ok(user);
                    }
                    Err(e @ Error::Unauthenticated { .. }) => auth_errors.push(("JWT session", e)),
                    Err(e) => return Err(e),
                },
                Some(Err(Error::Internal { operation })) => return Err(Error::Internal { operation }),
                Some(Err(e)) => {
                    trace!("JWT session authentication failed: {:?}", e);
                    auth_errors.push(("JWT session", e));
                }
                None => trace!("No JWT session authentication attempted"),
            }
        }

        if state.config.auth.proxy_header.enabled {
            match try_proxy_header_auth(parts, &state.config, &state.db).await {
                Some(Ok(user)) => {
                    debug!("Found proxy header authenticated user: {}", user.id);
                    return Ok(user);
                }
                Some(Err(e)) => {
                    trace!("Proxy header authentication failed: {:?}", e);
                    auth_errors.push(("Proxy header", e));
                }
                None => trace!("No proxy header authentication attempted"),
            }
        }

        if auth_errors.is_empty() {
            trace!("No authentication credentials found in request");
        } else {
            trace!("All authentication attempts failed ({}): {:?}", auth_errors.len(), auth_errors);
        }
        Err(Error::Unauthenticated { message: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_config, create_test_user};
    use axum::http::StatusCode;

    fn state(pool: SqlitePool, config: Config) -> AppState {
        AppState::builder().db(pool).config(config).build()
    }

    fn parts_with_header(header_name: &str, header_value: &str) -> Parts {
        let request = axum::http::Request::builder()
            .uri("http://localhost/test")
            .header(header_name, header_value)
            .body(())
            .unwrap();
        request.into_parts().0
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_existing_user_extraction(pool: SqlitePool) {
        let config = create_test_config();
        let header = config.auth.proxy_header.header_name.clone();
        let test_user = create_test_user(&pool, names::USER).await;
        let state = state(pool, config);

        let mut parts = parts_with_header(&header, &test_user.email);
        let current_user = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();

        assert_eq!(current_user.id, test_user.id);
        assert_eq!(current_user.username, test_user.username);
        assert_eq!(current_user.roles, vec!["user".to_string()]);
        assert_eq!(current_user.permissions.len(), 12);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_auto_create_nonexistent_user(pool: SqlitePool) {
        let config = create_test_config();
        let header = config.auth.proxy_header.header_name.clone();
        let state = state(pool.clone(), config);

        let new_email = "newcomer@example.com";
        let mut parts = parts_with_header(&header, new_email);
        let current_user = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();

        assert_eq!(current_user.email, new_email);
        assert_eq!(current_user.username, "newcomer");
        assert!(current_user.roles.contains(&"user".to_string()));

        let mut conn = pool.acquire().await.unwrap();
        let db_user = Users::new(&mut conn).get_user_by_email(new_email).await.unwrap().unwrap();
        assert_eq!(db_user.auth_source, "proxy-header");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_auto_create_disabled(pool: SqlitePool) {
        let mut config = create_test_config();
        config.auth.proxy_header.auto_create_users = false;
        let header = config.auth.proxy_header.header_name.clone();
        let state = state(pool, config);

        let mut parts = parts_with_header(&header, "stranger@example.com");
        let error = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_session_cookie_reloads_roles(pool: SqlitePool) {
        let config = create_test_config();
        let cookie_name = config.auth.native.session.cookie_name.clone();
        let test_user = create_test_user(&pool, names::USER).await;

        let mut conn = pool.acquire().await.unwrap();
        let db_user = Users::new(&mut conn).get_by_id(test_user.id).await.unwrap().unwrap();
        let stale = load_current_user(&mut conn, db_user).await.unwrap();
        let token = session::create_session_token(&stale, &config).unwrap();

        // Promote after the token was issued
        let admin_role = crate::db::handlers::Roles::new(&mut conn)
            .get_by_name(names::ADMIN)
            .await
            .unwrap()
            .unwrap();
        Users::new(&mut conn)
            .update(
                test_user.id,
                &crate::db::models::users::UserUpdateDBRequest {
                    role_ids: Some(vec![admin_role.id]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        drop(conn);

        let state = state(pool, config);
        let mut parts = parts_with_header("cookie", &format!("other=1; {cookie_name}={token}"));
        let current_user = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(current_user.id, test_user.id);
        assert_eq!(current_user.roles, vec!["admin".to_string()]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_invalid_session_cookie_is_unauthenticated(pool: SqlitePool) {
        let config = create_test_config();
        let cookie_name = config.auth.native.session.cookie_name.clone();
        let state = state(pool, config);

        let mut parts = parts_with_header("cookie", &format!("{cookie_name}=garbage"));
        let error = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_missing_credentials_returns_unauthorized(pool: SqlitePool) {
        let state = state(pool, create_test_config());

        let request = axum::http::Request::builder().uri("http://localhost/test").body(()).unwrap();
        let (mut parts, _body) = request.into_parts();

        let error = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_username_from_email() {
        let cases = [
            ("simple@example.com", "simple"),
            ("user.name@domain.co.uk", "user.name"),
            ("test+tag@gmail.com", "test+tag"),
            ("no-at-sign", "no-at-sign"),
            ("@domain.com", "user"),
        ];

        for (email, expected) in cases {
            assert_eq!(username_from_email(email), expected, "Failed for email: {email}");
        }
    }
}
