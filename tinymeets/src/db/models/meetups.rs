//! Database models for meetups.

use crate::types::{LocationId, MeetupId, TopicId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database request for creating a new meetup
#[derive(Debug, Clone)]
pub struct MeetupCreateDBRequest {
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location_id: LocationId,
    pub owner_id: UserId,
    pub topic_ids: Vec<TopicId>,
}

/// Database request for updating a meetup, `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct MeetupUpdateDBRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub location_id: Option<LocationId>,
    /// Replaces the meetup's topics when set
    pub topic_ids: Option<Vec<TopicId>>,
}

/// Database response for a meetup
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct MeetupDBResponse {
    pub id: MeetupId,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location_id: LocationId,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
