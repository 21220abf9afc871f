//! Database models for meetup participants.

use crate::types::{MeetupId, ParticipantId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// A participant row joined with the participating user's public fields
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ParticipantDBResponse {
    pub id: ParticipantId,
    pub meetup_id: MeetupId,
    pub user_id: UserId,
    pub username: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}
