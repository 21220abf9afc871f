//! Database record models.
//!
//! Request structs (`*CreateDBRequest`, `*UpdateDBRequest`) are what repositories accept and
//! `*DBResponse` structs are what they return. They are kept apart from the API models in
//! [`crate::api::models`] so storage and wire formats can evolve independently; the API layer
//! converts with `From` impls.
//!
//! - [`users`], [`roles`]: accounts and role-based access control
//! - [`locations`], [`location_images`]: venues and their optional picture
//! - [`meetups`], [`participants`], [`topics`]: scheduled gatherings and who attends them

pub mod location_images;
pub mod locations;
pub mod meetups;
pub mod participants;
pub mod roles;
pub mod topics;
pub mod users;
