//! # tinymeets: small in-person meetups at local coffee shops
//!
//! `tinymeets` is the backend for Tiny Meets, a place to host and join micro-meetups. Hosts pick a
//! venue from a curated list of locations, choose a half-hour slot, and tag the meetup with a few
//! topics. Everyone else can explore upcoming meetups, see who else is going, and join or leave
//! with one click.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer and
//! uses SQLite through SQLx for persistence. A single binary serves a JSON API under `/api/v1`,
//! native authentication under `/authentication`, and binary resources (location images) under
//! `/resources`.
//!
//! ### Request Flow
//!
//! Requests are authenticated by the [`CurrentUser`](api::models::users::CurrentUser) extractor,
//! which accepts either a signed session cookie issued by `/authentication/login` or a trusted
//! proxy header carrying the user's email. Handlers that need more than a signed-in user ask for a
//! permission extractor from [`auth::permissions`], so authorization failures are rejected before
//! any handler code runs. Handlers then talk to the database through the repositories in
//! [`db::handlers`], converting records to the API models in [`api::models`].
//!
//! ### Core Components
//!
//! - The **API layer** ([`api`]) holds the route handlers and request/response models, all
//!   documented with `utoipa` and browsable at `/api/docs`.
//! - The **authentication layer** ([`auth`]) handles password hashing, JWT session cookies, the
//!   proxy header, and role-based permission checks.
//! - The **database layer** ([`db`]) uses the repository pattern over SQLite. Migrations are
//!   embedded and run on startup; they also seed the `admin` and `user` roles and a few topics.
//! - The **scheduling module** ([`scheduling`]) owns the slot picker rules: half-hour slots, a
//!   booking window, busy-level hints, and human-readable summaries.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use tinymeets::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Parse CLI arguments and load configuration
//!     let args = tinymeets::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     // Initialize telemetry (structured logging and optional OpenTelemetry)
//!     tinymeets::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     // Create and start the application
//!     let app = Application::new(config).await?;
//!
//!     // Run with graceful shutdown on Ctrl+C
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     }).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod scheduling;
mod static_assets;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::{
    auth::password,
    config::CorsOrigin,
    db::{
        errors::DbError,
        handlers::{Repository, Roles, Users, roles::names},
        models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    },
    openapi::ApiDoc,
};
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{self, HeaderValue},
    routing::{delete, get, patch, post, put},
};
use bon::Builder;
pub use config::Config;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{str::FromStr, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{LocationId, MeetupId, UserId};

/// Headroom on top of `uploads.max_image_size` for the other multipart fields, so oversized images
/// are caught by the upload handler rather than by the body limit.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Application state shared across all request handlers.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .config(config)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
}

/// Get the tinymeets database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial admin user if it doesn't exist.
///
/// This function is idempotent. An existing account with the admin email keeps its id, is granted
/// the `admin` role if it lost it, and has its password replaced when `password` is given.
///
/// # Example
///
/// ```no_run
/// # use tinymeets::create_initial_admin_user;
/// # use sqlx::SqlitePool;
/// # async fn example(pool: SqlitePool) -> anyhow::Result<()> {
/// let user_id = create_initial_admin_user("admin@example.com", "admin", Some("secure_password"), &pool).await?;
/// # Ok(())
/// # }
/// ```
#[instrument(skip_all, fields(email = %email))]
pub async fn create_initial_admin_user(
    email: &str,
    username: &str,
    password: Option<&str>,
    db: &SqlitePool,
) -> Result<UserId, DbError> {
    let password_hash = match password {
        Some(pwd) => Some(password::hash_password(pwd).map_err(|e| anyhow::anyhow!("Failed to hash admin password: {e}"))?),
        None => None,
    };

    let mut tx = db.begin().await?;

    let existing = Users::new(&mut tx).get_user_by_email(email).await?;
    let Some(existing) = existing else {
        let created = Users::new(&mut tx)
            .create(&UserCreateDBRequest {
                email: email.to_string(),
                username: username.to_string(),
                name: None,
                password_hash,
                auth_source: "system".to_string(),
                roles: vec![names::ADMIN.to_string()],
            })
            .await?;
        tx.commit().await?;
        info!(user_id = %created.id, "Created initial admin user");
        return Ok(created.id);
    };

    let role_ids = if existing.has_role(names::ADMIN) {
        None
    } else {
        let admin = Roles::new(&mut tx).get_by_name(names::ADMIN).await?.ok_or(DbError::NotFound)?;
        let mut ids: Vec<_> = existing.roles.iter().map(|r| r.id).collect();
        ids.push(admin.id);
        Some(ids)
    };

    if password_hash.is_some() || role_ids.is_some() {
        Users::new(&mut tx)
            .update(
                existing.id,
                &UserUpdateDBRequest {
                    password_hash,
                    role_ids,
                    ..Default::default()
                },
            )
            .await?;
    }
    tx.commit().await?;
    Ok(existing.id)
}

/// Open the SQLite pool described by the configuration
async fn connect(config: &Config) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database.url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.database.pool.max_connections)
        .min_connections(config.database.pool.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.pool.acquire_timeout_secs))
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Run migrations and make sure the initial admin user exists
async fn setup_database(config: &Config, pool: &SqlitePool) -> anyhow::Result<()> {
    migrator().run(pool).await?;

    create_initial_admin_user(
        &config.admin_email,
        &config.admin_username,
        config.admin_password.as_deref(),
        pool,
    )
    .await
    .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {}", e))?;

    Ok(())
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.auth.security.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().trim_end_matches('/').parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(config.auth.security.cors.allow_credentials)
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::PATCH,
            http::Method::DELETE,
        ])
        .allow_headers([http::header::CONTENT_TYPE])
        .expose_headers(vec![http::header::LOCATION]);

    if let Some(max_age) = config.auth.security.cors.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
///
/// - Authentication routes at `/authentication/*`
/// - The JSON API nested under `/api/v1`
/// - Binary resources at `/resources/*`
/// - OpenAPI JSON at `/api/openapi.json` and interactive docs at `/api/docs`
/// - CORS and request tracing on everything
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    use api::handlers;

    let upload_limit = DefaultBodyLimit::max(
        usize::try_from(state.config.uploads.max_image_size)
            .unwrap_or(usize::MAX)
            .saturating_add(MULTIPART_OVERHEAD),
    );

    // Authentication routes (at root level, can be masked when deployed behind SSO proxy)
    let auth_routes = Router::new()
        .route(
            "/authentication/register",
            get(handlers::auth::get_registration_info).post(handlers::auth::register),
        )
        .route(
            "/authentication/login",
            get(handlers::auth::get_login_info).post(handlers::auth::login),
        )
        .route("/authentication/logout", post(handlers::auth::logout))
        .with_state(state.clone());

    let resource_routes = Router::new()
        .route(
            "/resources/location-images/{location_id}",
            get(handlers::resources::get_location_image),
        )
        .route("/resources/placeholder.svg", get(handlers::resources::get_placeholder_image))
        .with_state(state.clone());

    let api_routes = Router::new()
        // Current user and administration
        .route("/users/current", get(handlers::users::get_current_user))
        .route("/admin/users", get(handlers::users::list_users))
        .route("/admin/users/{user_id}/roles", put(handlers::users::update_user_roles))
        .route("/admin/roles", get(handlers::roles::list_roles))
        // Locations (writes are admin-only)
        .route("/locations", get(handlers::locations::list_locations))
        .route("/locations", post(handlers::locations::create_location).layer(upload_limit.clone()))
        .route("/locations/{id}", get(handlers::locations::get_location))
        .route("/locations/{id}", patch(handlers::locations::update_location))
        .route("/locations/{id}", delete(handlers::locations::delete_location))
        .route(
            "/locations/{id}/image",
            put(handlers::locations::replace_location_image).layer(upload_limit),
        )
        // Meetups
        .route("/meetups", get(handlers::meetups::list_meetups))
        .route("/meetups", post(handlers::meetups::create_meetup))
        .route("/meetups/{id}", get(handlers::meetups::get_meetup))
        .route("/meetups/{id}", patch(handlers::meetups::update_meetup))
        .route("/meetups/{id}", delete(handlers::meetups::delete_meetup))
        .route("/meetups/{id}/participants", post(handlers::meetups::join_meetup))
        .route("/meetups/{id}/participants", delete(handlers::meetups::leave_meetup))
        .route("/users/{username}/meetups", get(handlers::meetups::list_owner_meetups))
        .route("/topics", get(handlers::topics::list_topics))
        // Slot picker
        .route("/schedule/slots", get(handlers::scheduling::list_slots))
        .route("/schedule/next-slot", get(handlers::scheduling::next_slot))
        .route("/schedule/summary", get(handlers::scheduling::summarize_slot))
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/api/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/api/docs", ApiDoc::openapi()))
        .merge(auth_routes)
        .merge(resource_routes)
        .nest("/api/v1", api_routes);

    let router = router.layer(create_cors_layer(&state.config)?);

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// The HTTP server and the resources it owns.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] opens the database, runs migrations and ensures the admin
///    user exists
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: When the shutdown signal is received, in-flight requests finish, then the pool
///    is closed and telemetry flushed
pub struct Application {
    router: Router,
    config: Config,
    pool: SqlitePool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::new_with_pool(config, None).await
    }

    /// Create an application, reusing `pool` instead of connecting when given
    pub async fn new_with_pool(config: Config, pool: Option<SqlitePool>) -> anyhow::Result<Self> {
        debug!("Starting tinymeets with configuration: {:#?}", config);

        let pool = match pool {
            Some(pool) => pool,
            None => connect(&config).await?,
        };
        setup_database(&config, &pool).await?;

        let app_state = AppState::builder().db(pool.clone()).config(config.clone()).build();
        let router = build_router(&app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Tiny Meets listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::test_utils::{create_test_app, create_test_config, create_test_user};
    use axum::http::{HeaderValue, StatusCode};

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_initial_admin_user_new_user(pool: SqlitePool) {
        let user_id = create_initial_admin_user("new-admin@example.com", "new-admin", Some("hunter22"), &pool)
            .await
            .expect("Should create admin user successfully");

        let mut conn = pool.acquire().await.unwrap();
        let created = Users::new(&mut conn)
            .get_user_by_email("new-admin@example.com")
            .await
            .unwrap()
            .expect("User should exist");

        assert_eq!(created.id, user_id);
        assert_eq!(created.username, "new-admin");
        assert_eq!(created.auth_source, "system");
        assert!(created.has_role(names::ADMIN));
        assert!(verify_password("hunter22", created.password_hash.as_deref().unwrap()).unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_initial_admin_user_is_idempotent(pool: SqlitePool) {
        let first = create_initial_admin_user("admin@example.com", "admin", None, &pool).await.unwrap();
        let second = create_initial_admin_user("admin@example.com", "admin", Some("new-password"), &pool)
            .await
            .unwrap();
        assert_eq!(first, second);

        let mut conn = pool.acquire().await.unwrap();
        let admin = Users::new(&mut conn).get_by_id(first).await.unwrap().unwrap();
        assert!(verify_password("new-password", admin.password_hash.as_deref().unwrap()).unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_initial_admin_user_promotes_existing_account(pool: SqlitePool) {
        let user = create_test_user(&pool, names::USER).await;

        let id = create_initial_admin_user(&user.email, &user.username, None, &pool).await.unwrap();
        assert_eq!(id, user.id);

        let mut conn = pool.acquire().await.unwrap();
        let promoted = Users::new(&mut conn).get_by_id(id).await.unwrap().unwrap();
        assert!(promoted.has_role(names::ADMIN));
        assert!(promoted.has_role(names::USER));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_application_integration(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;

        let response = server.get("/healthz").await;
        response.assert_status_ok();
        assert_eq!(response.text(), "OK");

        // The configured admin exists once the app is up
        let mut conn = pool.acquire().await.unwrap();
        let admin = Users::new(&mut conn).get_user_by_email("admin@test.com").await.unwrap();
        assert!(admin.is_some_and(|a| a.has_role(names::ADMIN)));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_openapi_json_endpoint(pool: SqlitePool) {
        let server = create_test_app(pool).await;

        let response = server.get("/api/openapi.json").await;
        response.assert_status_ok();
        let doc: serde_json::Value = response.json();
        assert!(doc["paths"]["/api/v1/meetups"].is_object());
        assert!(doc["paths"]["/authentication/register"].is_object());

        server.get("/api/docs").await.assert_status_ok();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_cors_preflight(pool: SqlitePool) {
        let mut config = create_test_config();
        config.auth.security.cors.allowed_origins = vec![CorsOrigin::Url("https://meets.example.com".parse().unwrap())];
        let server = crate::test_utils::create_test_app_with_config(pool, config).await;

        let response = server
            .method(http::Method::OPTIONS, "/api/v1/meetups")
            .add_header("origin", "https://meets.example.com")
            .add_header("access-control-request-method", "POST")
            .await;
        assert_eq!(
            response.header("access-control-allow-origin"),
            HeaderValue::from_static("https://meets.example.com")
        );
        assert_ne!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_cors_layer_from_test_config() {
        let config = create_test_config();
        assert!(create_cors_layer(&config).is_ok());
    }
}
