//! API request and response models.
//!
//! These are the JSON shapes exchanged with clients, kept separate from the database records in
//! [`crate::db::models`]. All of them derive [`utoipa::ToSchema`] for the OpenAPI document.

pub mod auth;
pub mod locations;
pub mod meetups;
pub mod pagination;
pub mod roles;
pub mod scheduling;
pub mod topics;
pub mod users;
