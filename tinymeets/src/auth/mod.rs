//! Authentication and authorization.
//!
//! # Authentication
//!
//! Requests are authenticated in one of two ways, tried in order:
//!
//! 1. **Session cookie** (native auth): users register or log in under `/authentication` with an
//!    email and password. They receive a signed JWT in an HTTP-only cookie that identifies the
//!    user; the user record is reloaded from the database on every request.
//! 2. **Proxy header**: when running behind a trusted authenticating proxy, the proxy puts the
//!    user's email in a header (`x-tinymeets-user` by default). Unknown users can be created on
//!    first sight with the `user` role.
//!
//! Requests with neither, or with only invalid credentials, are rejected with 401.
//!
//! # Authorization
//!
//! Users hold roles, and roles grant `action:entity:access` permissions. The seeded `user` role
//! can act on its own meetups and account; `admin` can act on anything. See [`permissions`].
//!
//! ```ignore
//! use tinymeets::auth::permissions::{operation, resource, RequiresPermission};
//!
//! async fn create_meetup(
//!     current_user: RequiresPermission<resource::Meetups, operation::CreateOwn>,
//! ) -> Result<String, Error> {
//!     Ok(format!("Hello, {}!", current_user.username))
//! }
//! ```
//!
//! # Modules
//!
//! - [`current_user`]: the [`CurrentUser`](crate::api::models::users::CurrentUser) extractor
//! - [`password`]: Argon2id password hashing
//! - [`permissions`]: permission checks and extractors
//! - [`session`]: JWT session tokens

pub mod current_user;
pub mod password;
pub mod permissions;
pub mod session;
