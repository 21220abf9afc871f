//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] covers the whole HTTP surface: the unversioned `/authentication/*` and
//! `/resources/*` routes, plus [`v1::V1ApiDoc`] nested under `/api/v1`.

pub mod v1;

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::api::{handlers, models};
use crate::config::{ProxyHeaderAuthConfig, SessionConfig};

/// Security schemes for session cookies and the trusted proxy header.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let Some(components) = openapi.components.as_mut() else {
            return;
        };
        components.security_schemes.insert(
            "CookieAuth".to_string(),
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                SessionConfig::default().cookie_name,
                "Session cookie set by `/authentication/login` and `/authentication/register`.".to_string(),
            ))),
        );
        components.security_schemes.insert(
            "ProxyHeader".to_string(),
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                ProxyHeaderAuthConfig::default().header_name,
                "Email of a user authenticated by a trusted upstream proxy.".to_string(),
            ))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::get_registration_info,
        handlers::auth::register,
        handlers::auth::get_login_info,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::resources::get_location_image,
        handlers::resources::get_placeholder_image,
    ),
    components(schemas(
        models::auth::RegisterRequest,
        models::auth::LoginRequest,
        models::auth::AuthResponse,
        models::auth::AuthSuccessResponse,
        models::auth::RegistrationInfo,
        models::auth::LoginInfo,
    )),
    nest(
        (path = "/api/v1", api = v1::V1ApiDoc)
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "authentication", description = "Register, log in and log out with email and password"),
        (name = "resources", description = "Binary resources: location images and the placeholder"),
    ),
    info(
        title = "Tiny Meets API",
        description = "Host and join small in-person meetups at local coffee shops.

## Authentication

Browser clients sign in through `/authentication/login` and receive an HTTP-only session cookie.
Deployments behind an authenticating proxy can instead pass the user's email in the
`x-tinymeets-user` header.

## Errors

Most errors are returned as a plain-text message with the matching status code. Conflicts
(`409`) are returned as JSON with a `message` field.",
    ),
)]
pub struct ApiDoc;
