//! Permission checks and authorization extractors.
//!
//! Permissions are `action:entity:access` strings granted to roles (see [`crate::types`]). A
//! handler either declares the permission it needs in its signature:
//!
//! ```ignore
//! async fn delete_location(
//!     _: RequiresPermission<resource::Locations, operation::DeleteAll>,
//!     // ...
//! ) -> Result<StatusCode, Error> { /* ... */ }
//! ```
//!
//! or, when the answer depends on who owns the record, resolves it at runtime with
//! [`require_own_or_any`].

use std::{marker::PhantomData, ops::Deref};

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    AppState,
    api::models::users::CurrentUser,
    errors::Error,
    types::{Access, Action, Operation, Permission, PermissionString, Resource, UserId},
};

/// Type-level resources for [`RequiresPermission`]
pub mod resource {
    use crate::types::Resource;

    pub trait ResourceMarker: Send + Sync + 'static {
        const RESOURCE: Resource;
    }

    pub struct Users;
    pub struct Meetups;
    pub struct Locations;

    impl ResourceMarker for Users {
        const RESOURCE: Resource = Resource::Users;
    }
    impl ResourceMarker for Meetups {
        const RESOURCE: Resource = Resource::Meetups;
    }
    impl ResourceMarker for Locations {
        const RESOURCE: Resource = Resource::Locations;
    }
}

/// Type-level operations for [`RequiresPermission`]
pub mod operation {
    use crate::types::Operation;

    pub trait OperationMarker: Send + Sync + 'static {
        const OPERATION: Operation;
    }

    macro_rules! operations {
        ($($name:ident),* $(,)?) => {
            $(
                pub struct $name;
                impl OperationMarker for $name {
                    const OPERATION: Operation = Operation::$name;
                }
            )*
        };
    }

    operations!(CreateAll, CreateOwn, ReadAll, ReadOwn, UpdateAll, UpdateOwn, DeleteAll, DeleteOwn);
}

/// Type-level roles for [`RequiresRole`]
pub mod role {
    use crate::db::handlers::roles::names;

    pub trait RoleMarker: Send + Sync + 'static {
        const NAME: &'static str;
    }

    pub struct Admin;

    impl RoleMarker for Admin {
        const NAME: &'static str = names::ADMIN;
    }
}

/// Does the user hold exactly this `action:entity:access` permission?
pub fn has_permission(user: &CurrentUser, resource: Resource, operation: Operation) -> bool {
    user.permissions.contains(&PermissionString::new(resource, operation))
}

pub fn has_role(user: &CurrentUser, name: &str) -> bool {
    user.roles.iter().any(|r| r == name)
}

/// Authorize `action` on a record owned by `owner_id`.
///
/// Owners need the `own` permission for the action, everyone else the `any` one.
pub fn require_own_or_any(user: &CurrentUser, resource: Resource, action: Action, owner_id: UserId) -> Result<(), Error> {
    let access = if user.id == owner_id { Access::Own } else { Access::Any };
    let operation = Operation::new(action, access);

    if has_permission(user, resource, operation) {
        return Ok(());
    }

    // `any` covers the caller's own records too
    if access == Access::Own && has_permission(user, resource, Operation::new(action, Access::Any)) {
        return Ok(());
    }

    Err(Error::InsufficientPermissions {
        required: Permission::Allow(resource, operation),
        action: operation,
        resource: resource.entity().to_string(),
    })
}

/// Extractor that authenticates the caller and requires one permission.
///
/// Rejects with 401 when nobody is signed in and 403 when the permission is missing. Derefs to the
/// [`CurrentUser`].
pub struct RequiresPermission<R, O> {
    user: CurrentUser,
    _marker: PhantomData<fn() -> (R, O)>,
}

impl<R, O> Deref for RequiresPermission<R, O> {
    type Target = CurrentUser;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl<R, O> FromRequestParts<AppState> for RequiresPermission<R, O>
where
    R: resource::ResourceMarker,
    O: operation::OperationMarker,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;

        if !has_permission(&user, R::RESOURCE, O::OPERATION) {
            return Err(Error::InsufficientPermissions {
                required: Permission::Allow(R::RESOURCE, O::OPERATION),
                action: O::OPERATION,
                resource: R::RESOURCE.entity().to_string(),
            });
        }

        Ok(Self {
            user,
            _marker: PhantomData,
        })
    }
}

/// Extractor that authenticates the caller and requires a role by name.
pub struct RequiresRole<R> {
    user: CurrentUser,
    _marker: PhantomData<fn() -> R>,
}

impl<R> Deref for RequiresRole<R> {
    type Target = CurrentUser;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl<R> FromRequestParts<AppState> for RequiresRole<R>
where
    R: role::RoleMarker,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;

        if !has_role(&user, R::NAME) {
            return Err(Error::MissingRole {
                role: R::NAME.to_string(),
            });
        }

        Ok(Self {
            user,
            _marker: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user_with(permissions: &[&str], roles: &[&str]) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            username: "someone".to_string(),
            name: None,
            roles: roles.iter().map(|r| r.to_string()).collect(),
            permissions: permissions.iter().map(|p| p.parse().unwrap()).collect(),
        }
    }

    #[test]
    fn test_has_permission_is_exact() {
        let user = user_with(&["delete:meetup:own"], &["user"]);
        assert!(has_permission(&user, Resource::Meetups, Operation::DeleteOwn));
        assert!(!has_permission(&user, Resource::Meetups, Operation::DeleteAll));
        assert!(!has_permission(&user, Resource::Locations, Operation::DeleteOwn));
    }

    #[test]
    fn test_has_role() {
        let user = user_with(&[], &["admin", "user"]);
        assert!(has_role(&user, "admin"));
        assert!(!has_role(&user, "moderator"));
    }

    #[test]
    fn test_own_or_any_for_owner() {
        let user = user_with(&["update:meetup:own"], &["user"]);
        assert!(require_own_or_any(&user, Resource::Meetups, Action::Update, user.id).is_ok());
        assert!(require_own_or_any(&user, Resource::Meetups, Action::Delete, user.id).is_err());
    }

    #[test]
    fn test_own_or_any_for_someone_else() {
        let user = user_with(&["update:meetup:own"], &["user"]);
        let err = require_own_or_any(&user, Resource::Meetups, Action::Update, Uuid::new_v4()).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
        assert!(matches!(
            err,
            Error::InsufficientPermissions {
                action: Operation::UpdateAll,
                ..
            }
        ));

        let admin = user_with(&["update:meetup:any"], &["admin"]);
        assert!(require_own_or_any(&admin, Resource::Meetups, Action::Update, Uuid::new_v4()).is_ok());
        assert!(require_own_or_any(&admin, Resource::Meetups, Action::Update, admin.id).is_ok());
    }
}
