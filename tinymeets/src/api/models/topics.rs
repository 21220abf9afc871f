//! API response models for topics.

use crate::{db::models::topics::TopicDBResponse, types::TopicId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TopicResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: TopicId,
    pub name: String,
}

impl From<TopicDBResponse> for TopicResponse {
    fn from(db: TopicDBResponse) -> Self {
        Self { id: db.id, name: db.name }
    }
}
