//! Database models for topics.

use crate::types::TopicId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct TopicDBResponse {
    pub id: TopicId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
