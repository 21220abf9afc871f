//! Database models for locations.

use crate::types::{LocationId, LocationImageId};
use chrono::{DateTime, Utc};

/// Database request for creating a new location
#[derive(Debug, Clone)]
pub struct LocationCreateDBRequest {
    pub name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
}

/// Database request for updating a location, `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct LocationUpdateDBRequest {
    pub name: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
}

/// The image attached to a location, without its bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationImageRef {
    pub id: LocationImageId,
    pub alt_text: Option<String>,
}

/// Database response for a location
#[derive(Debug, Clone)]
pub struct LocationDBResponse {
    pub id: LocationId,
    pub name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
    pub image: Option<LocationImageRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
