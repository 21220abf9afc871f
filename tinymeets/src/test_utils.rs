//! Helpers for building a test server and seeding fixtures.

use crate::config::{AuthConfig, Config, NativeAuthConfig, PoolSettings, ProxyHeaderAuthConfig, SessionConfig};
use crate::db::{
    handlers::{Locations, Meetups, Repository, Users, roles::names},
    models::{
        locations::{LocationCreateDBRequest, LocationDBResponse},
        meetups::{MeetupCreateDBRequest, MeetupDBResponse},
        users::{UserCreateDBRequest, UserDBResponse},
    },
};
use axum_test::TestServer;
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

pub async fn create_test_app(pool: SqlitePool) -> TestServer {
    create_test_app_with_config(pool, create_test_config()).await
}

pub async fn create_test_app_with_config(pool: SqlitePool, config: Config) -> TestServer {
    let app = crate::Application::new_with_pool(config, Some(pool))
        .await
        .expect("Failed to create application");

    app.into_test_server()
}

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database: crate::config::DatabaseConfig {
            // Will get overriden by the sqlx::test pool
            url: "sqlite::memory:".to_string(),
            pool: PoolSettings {
                max_connections: 1,
                min_connections: 1,
                ..Default::default()
            },
        },
        admin_email: "admin@test.com".to_string(),
        admin_username: "admin".to_string(),
        admin_password: None,
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        auth: AuthConfig {
            native: NativeAuthConfig {
                enabled: true,
                allow_registration: true,
                session: SessionConfig {
                    cookie_secure: false,
                    ..Default::default()
                },
                ..Default::default()
            },
            proxy_header: ProxyHeaderAuthConfig {
                enabled: true,
                ..Default::default()
            },
            ..Default::default()
        },
        ..Default::default()
    }
}

/// A user with a single role, `names::USER` or `names::ADMIN`
pub async fn create_test_user(pool: &SqlitePool, role: &str) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut users_repo = Users::new(&mut conn);
    let user_id = Uuid::new_v4();
    let username = format!("testuser_{}", user_id.simple());
    let email = format!("{username}@example.com");

    let user_create = UserCreateDBRequest {
        email,
        username,
        name: Some("Test User".to_string()),
        password_hash: None,
        auth_source: "test".to_string(),
        roles: vec![role.to_string()],
    };

    users_repo.create(&user_create).await.expect("Failed to create test user")
}

pub async fn create_test_admin_user(pool: &SqlitePool) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut users_repo = Users::new(&mut conn);
    let user_id = Uuid::new_v4();
    let username = format!("testadmin_{}", user_id.simple());
    let email = format!("{username}@example.com");

    let user_create = UserCreateDBRequest {
        email,
        username,
        name: Some("Test Admin User".to_string()),
        password_hash: None,
        auth_source: "test".to_string(),
        roles: vec![names::ADMIN.to_string()],
    };

    users_repo.create(&user_create).await.expect("Failed to create test admin user")
}

/// Proxy header that authenticates as `user` under [`create_test_config`]
pub fn add_auth_headers(user: &UserDBResponse) -> Vec<(String, String)> {
    let config = ProxyHeaderAuthConfig::default();
    vec![(config.header_name, user.email.clone())]
}

pub async fn create_test_location(pool: &SqlitePool, name: &str) -> LocationDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    Locations::new(&mut conn)
        .create(&LocationCreateDBRequest {
            name: name.to_string(),
            street: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip: "62701".to_string(),
            country: "USA".to_string(),
        })
        .await
        .expect("Failed to create test location")
}

/// A half-hour meetup starting `days_ahead` days from now
pub async fn create_test_meetup(
    pool: &SqlitePool,
    owner: &UserDBResponse,
    location: &LocationDBResponse,
    title: &str,
    days_ahead: i64,
) -> MeetupDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let start_time = Utc::now() + Duration::days(days_ahead);
    Meetups::new(&mut conn)
        .create(&MeetupCreateDBRequest {
            title: title.to_string(),
            description: format!("{title} - a meetup created for tests"),
            start_time,
            end_time: start_time + Duration::minutes(30),
            location_id: location.id,
            owner_id: owner.id,
            topic_ids: vec![],
        })
        .await
        .expect("Failed to create test meetup")
}
