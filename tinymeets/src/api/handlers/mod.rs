//! HTTP request handlers for all API endpoints.
//!
//! This module contains Axum route handlers organized by resource type.
//! Each handler is responsible for:
//! - Request validation and deserialization
//! - Authentication and authorization checks
//! - Business logic execution via database repositories
//! - Response serialization
//!
//! # Handler Modules
//!
//! - [`auth`]: Registration, login and logout
//! - [`locations`]: Location CRUD, including the multipart image upload
//! - [`meetups`]: Exploring, hosting, joining and leaving meetups
//! - [`resources`]: Raw location images and the placeholder picture
//! - [`roles`]: Read-only role listing for administrators
//! - [`scheduling`]: Time slot picker support
//! - [`topics`]: Topic listing
//! - [`users`]: The current user and role assignment
//!
//! # Authentication
//!
//! Handlers that need a signed-in user take a [`CurrentUser`](crate::api::models::users::CurrentUser)
//! or one of the extractors in [`crate::auth::permissions`], which reject with 401 or 403 before
//! the handler body runs.
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`] which converts to the matching HTTP status code and a
//! plain-text or JSON body.

pub mod auth;
pub mod locations;
pub mod meetups;
pub mod resources;
pub mod roles;
pub mod scheduling;
pub mod topics;
pub mod users;
