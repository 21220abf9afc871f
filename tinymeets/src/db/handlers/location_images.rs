//! Database repository for location images.
//!
//! A location has at most one image; storing a new one replaces the old bytes in place and keeps
//! the image id stable.

use crate::db::{
    errors::Result,
    models::location_images::{LocationImageDBRequest, LocationImageDBResponse},
};
use crate::types::{LocationId, abbrev_uuid};
use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::instrument;
use uuid::Uuid;

const IMAGE_COLUMNS: &str = "id, location_id, alt_text, content_type, blob, created_at, updated_at";

pub struct LocationImages<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> LocationImages<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Insert or replace the image for a location
    #[instrument(skip(self, request), fields(location_id = %abbrev_uuid(&request.location_id), size = request.blob.len()), err)]
    pub async fn upsert(&mut self, request: &LocationImageDBRequest) -> Result<LocationImageDBResponse> {
        let now = Utc::now();
        let image = sqlx::query_as::<_, LocationImageDBResponse>(&format!(
            "INSERT INTO location_images (id, location_id, alt_text, content_type, blob, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (location_id) DO UPDATE SET
                alt_text = excluded.alt_text,
                content_type = excluded.content_type,
                blob = excluded.blob,
                updated_at = excluded.updated_at
             RETURNING {IMAGE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(request.location_id)
        .bind(&request.alt_text)
        .bind(&request.content_type)
        .bind(&request.blob)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(image)
    }

    #[instrument(skip(self), fields(location_id = %abbrev_uuid(&location_id)), err)]
    pub async fn get_by_location(&mut self, location_id: LocationId) -> Result<Option<LocationImageDBResponse>> {
        let image = sqlx::query_as::<_, LocationImageDBResponse>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM location_images WHERE location_id = ?"
        ))
        .bind(location_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(image)
    }

    #[instrument(skip(self), fields(location_id = %abbrev_uuid(&location_id)), err)]
    pub async fn delete_for_location(&mut self, location_id: LocationId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM location_images WHERE location_id = ?")
            .bind(location_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
