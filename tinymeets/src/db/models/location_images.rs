//! Database models for location images.

use crate::types::{LocationId, LocationImageId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for storing a location's image
#[derive(Debug, Clone)]
pub struct LocationImageDBRequest {
    pub location_id: LocationId,
    pub alt_text: Option<String>,
    pub content_type: String,
    pub blob: Vec<u8>,
}

/// Database response for a location image, including the raw bytes
#[derive(Debug, Clone, FromRow)]
pub struct LocationImageDBResponse {
    pub id: LocationImageId,
    pub location_id: LocationId,
    pub alt_text: Option<String>,
    pub content_type: String,
    pub blob: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
