//! API request/response models for meetups and their participants.

use super::{
    locations::{LocationResponse, LocationSummary},
    pagination::Pagination,
    topics::TopicResponse,
    users::OwnerSummary,
};
use crate::{
    db::models::{meetups::MeetupDBResponse, participants::ParticipantDBResponse},
    errors::Error,
    types::{LocationId, MeetupId, UserId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

pub const MIN_TITLE_LENGTH: usize = 3;
pub const MIN_DESCRIPTION_LENGTH: usize = 10;

fn validate_title(title: &str) -> Result<(), Error> {
    if title.trim().chars().count() < MIN_TITLE_LENGTH {
        return Err(Error::BadRequest {
            message: format!("Title must be at least {MIN_TITLE_LENGTH} characters."),
        });
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), Error> {
    if description.trim().chars().count() < MIN_DESCRIPTION_LENGTH {
        return Err(Error::BadRequest {
            message: format!("Description must be at least {MIN_DESCRIPTION_LENGTH} characters."),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MeetupCreate {
    pub title: String,
    pub description: String,
    #[schema(value_type = String, format = "uuid")]
    pub location_id: LocationId,
    pub start_time: DateTime<Utc>,
    /// Defaults to one slot after `start_time`
    pub end_time: Option<DateTime<Utc>>,
    /// Topic names; unknown ones are created
    pub topics: Option<Vec<String>>,
}

impl MeetupCreate {
    /// Field checks that don't need the clock or the database
    pub fn validate(&self) -> Result<(), Error> {
        validate_title(&self.title)?;
        validate_description(&self.description)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct MeetupUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub location_id: Option<LocationId>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Replaces the meetup's topics when present
    pub topics: Option<Vec<String>>,
}

impl MeetupUpdate {
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParticipantResponse {
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub username: String,
    pub name: Option<String>,
    pub joined_at: DateTime<Utc>,
}

impl From<ParticipantDBResponse> for ParticipantResponse {
    fn from(db: ParticipantDBResponse) -> Self {
        Self {
            user_id: db.user_id,
            username: db.username,
            name: db.name,
            joined_at: db.created_at,
        }
    }
}

/// A meetup as returned after a write
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MeetupResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: MeetupId,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[schema(value_type = String, format = "uuid")]
    pub location_id: LocationId,
    #[schema(value_type = String, format = "uuid")]
    pub owner_id: UserId,
    pub topics: Vec<TopicResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MeetupResponse {
    pub fn new(db: MeetupDBResponse, topics: Vec<TopicResponse>) -> Self {
        Self {
            id: db.id,
            title: db.title,
            description: db.description,
            start_time: db.start_time,
            end_time: db.end_time,
            location_id: db.location_id,
            owner_id: db.owner_id,
            topics,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// One row of the explore listing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MeetupListItem {
    #[schema(value_type = String, format = "uuid")]
    pub id: MeetupId,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: LocationSummary,
    pub owner: OwnerSummary,
    pub participant_count: i64,
    pub topics: Vec<TopicResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MeetupDetailResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: MeetupId,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// How long ago the meetup was last changed, e.g. `"about 2 hours"`
    pub time_ago: String,
    pub owner: OwnerSummary,
    pub location: LocationResponse,
    pub participants: Vec<ParticipantResponse>,
    pub topics: Vec<TopicResponse>,
}

/// A meetup on its owner's profile
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OwnerMeetupResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: MeetupId,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub location: LocationSummary,
}

/// Query parameters for exploring meetups
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListMeetupsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,

    /// Case-insensitive substring match on title or description
    pub search: Option<String>,

    /// Only meetups at this location
    #[param(value_type = Option<String>, format = "uuid")]
    #[schema(value_type = Option<String>, format = "uuid")]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub location_id: Option<LocationId>,

    /// Only meetups that haven't started yet
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub upcoming: Option<bool>,
}
