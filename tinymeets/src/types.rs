//! Common type definitions and permission system types.
//!
//! This module defines:
//! - Type aliases for entity IDs (UserId, MeetupId, etc.)
//! - The `action:entity:access` permission vocabulary stored in the `permissions` table
//! - Resource and operation enums used by the authorization extractors
//!
//! # Permission System
//!
//! Permissions are granted to roles, and roles to users. Each permission row is a triple:
//!
//! - **action**: `create`, `read`, `update` or `delete`
//! - **entity**: `user`, `meetup` or `location` (see [`Resource`])
//! - **access**: `own` (only records the user owns) or `any` (every record)
//!
//! and is written as a single string, e.g. `delete:meetup:own`. [`Operation`] folds action and
//! access together the same way: `DeleteOwn` is `delete` + `own`.
//!
//! ```ignore
//! use tinymeets::types::{Operation, PermissionString, Resource};
//!
//! let p: PermissionString = "update:meetup:any".parse()?;
//! assert_eq!(p, PermissionString::new(Resource::Meetups, Operation::UpdateAll));
//! ```

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;
use uuid::Uuid;

// Type aliases for IDs
pub type UserId = Uuid;
pub type RoleId = Uuid;
pub type LocationId = Uuid;
pub type LocationImageId = Uuid;
pub type MeetupId = Uuid;
pub type ParticipantId = Uuid;
pub type TopicId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

/// The verb half of an [`Operation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

/// Whether a permission covers only the user's own records or all of them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    Own,
    Any,
}

// Operations that can be performed on resources
// *-All means unrestricted access, *-Own means restricted to own resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateAll,
    CreateOwn,
    ReadAll,
    ReadOwn,
    UpdateAll,
    UpdateOwn,
    DeleteAll,
    DeleteOwn,
}

impl Operation {
    pub fn new(action: Action, access: Access) -> Self {
        match (action, access) {
            (Action::Create, Access::Any) => Operation::CreateAll,
            (Action::Create, Access::Own) => Operation::CreateOwn,
            (Action::Read, Access::Any) => Operation::ReadAll,
            (Action::Read, Access::Own) => Operation::ReadOwn,
            (Action::Update, Access::Any) => Operation::UpdateAll,
            (Action::Update, Access::Own) => Operation::UpdateOwn,
            (Action::Delete, Access::Any) => Operation::DeleteAll,
            (Action::Delete, Access::Own) => Operation::DeleteOwn,
        }
    }

    pub fn action(&self) -> Action {
        match self {
            Operation::CreateAll | Operation::CreateOwn => Action::Create,
            Operation::ReadAll | Operation::ReadOwn => Action::Read,
            Operation::UpdateAll | Operation::UpdateOwn => Action::Update,
            Operation::DeleteAll | Operation::DeleteOwn => Action::Delete,
        }
    }

    pub fn access(&self) -> Access {
        match self {
            Operation::CreateAll | Operation::ReadAll | Operation::UpdateAll | Operation::DeleteAll => Access::Any,
            Operation::CreateOwn | Operation::ReadOwn | Operation::UpdateOwn | Operation::DeleteOwn => Access::Own,
        }
    }
}

// Resources that can be operated on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Users,
    Meetups,
    Locations,
}

impl Resource {
    /// The `entity` column value used in the permissions table
    pub fn entity(&self) -> &'static str {
        match self {
            Resource::Users => "user",
            Resource::Meetups => "meetup",
            Resource::Locations => "location",
        }
    }

    pub fn from_entity(entity: &str) -> Option<Self> {
        match entity {
            "user" => Some(Resource::Users),
            "meetup" => Some(Resource::Meetups),
            "location" => Some(Resource::Locations),
            _ => None,
        }
    }
}

// Permission types for authorization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permission {
    /// Simple permission: (Resource, Operation)
    Allow(Resource, Operation),
    /// Satisfied if any of the inner permissions is
    Any(Vec<Permission>),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action() {
            Action::Create => write!(f, "Create"),
            Action::Read => write!(f, "Read"),
            Action::Update => write!(f, "Update"),
            Action::Delete => write!(f, "Delete"),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Own => f.write_str("own"),
            Access::Any => f.write_str("any"),
        }
    }
}

/// Error returned when a permission string is not of the form `action:entity:access`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid permission string '{0}', expected action:entity:access")]
pub struct InvalidPermissionString(pub String);

/// A single granted permission, as stored in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PermissionString {
    pub resource: Resource,
    pub operation: Operation,
}

impl PermissionString {
    pub fn new(resource: Resource, operation: Operation) -> Self {
        Self { resource, operation }
    }

    /// Build from the three columns of a `permissions` row
    pub fn from_parts(action: &str, entity: &str, access: &str) -> Result<Self, InvalidPermissionString> {
        let invalid = || InvalidPermissionString(format!("{action}:{entity}:{access}"));

        let action = match action {
            "create" => Action::Create,
            "read" => Action::Read,
            "update" => Action::Update,
            "delete" => Action::Delete,
            _ => return Err(invalid()),
        };
        let resource = Resource::from_entity(entity).ok_or_else(invalid)?;
        let access = match access {
            "own" => Access::Own,
            "any" => Access::Any,
            _ => return Err(invalid()),
        };

        Ok(Self::new(resource, Operation::new(action, access)))
    }
}

impl FromStr for PermissionString {
    type Err = InvalidPermissionString;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(action), Some(entity), Some(access), None) => Self::from_parts(action, entity, access),
            _ => Err(InvalidPermissionString(s.to_string())),
        }
    }
}

impl fmt::Display for PermissionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.operation.action(),
            self.resource.entity(),
            self.operation.access()
        )
    }
}

impl Serialize for PermissionString {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PermissionString {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
