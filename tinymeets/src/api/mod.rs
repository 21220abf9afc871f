//! API layer for HTTP request handling and data models.
//!
//! This module contains the REST API implementation, organized into:
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Authentication** (`/authentication/*`): Registration, login and logout
//! - **Meetups** (`/api/v1/meetups/*`, `/api/v1/users/{username}/meetups`): Explore, host and join
//! - **Locations** (`/api/v1/locations/*`): Venues, managed by administrators
//! - **Schedule** (`/api/v1/schedule/*`): Slot picker data
//! - **Admin** (`/api/v1/admin/*`): Users and their roles
//! - **Resources** (`/resources/*`): Location images and the placeholder
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`.
//! API documentation is available at `/api/docs` when the server is running.

pub mod handlers;
pub mod models;
