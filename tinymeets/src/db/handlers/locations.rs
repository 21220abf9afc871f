//! Database repository for locations.

use crate::db::{
    errors::{DbError, Result},
    handlers::{repository::Repository, substring_pattern},
    models::locations::{LocationCreateDBRequest, LocationDBResponse, LocationImageRef, LocationUpdateDBRequest},
};
use crate::types::{LocationId, LocationImageId, abbrev_uuid};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing locations
#[derive(Debug, Clone)]
pub struct LocationFilter {
    pub skip: i64,
    pub limit: i64,
    /// Case-insensitive substring match on the location name
    pub search: Option<String>,
}

impl LocationFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit, search: None }
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search.filter(|s| !s.trim().is_empty());
        self
    }

    fn push_conditions<'a>(&'a self, query: &mut QueryBuilder<'a, Sqlite>) {
        query.push(" WHERE 1 = 1");
        if let Some(search) = &self.search {
            query
                .push(" AND lower(l.name) LIKE ")
                .push_bind(substring_pattern(search))
                .push(" ESCAPE '\\'");
        }
    }
}

// Location row with its (optional) image columns from the left join
#[derive(Debug, Clone, FromRow)]
struct Location {
    id: LocationId,
    name: String,
    street: String,
    city: String,
    state: String,
    zip: String,
    country: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    image_id: Option<LocationImageId>,
    image_alt_text: Option<String>,
}

impl From<Location> for LocationDBResponse {
    fn from(row: Location) -> Self {
        Self {
            id: row.id,
            name: row.name,
            street: row.street,
            city: row.city,
            state: row.state,
            zip: row.zip,
            country: row.country,
            image: row.image_id.map(|id| LocationImageRef {
                id,
                alt_text: row.image_alt_text,
            }),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const LOCATION_SELECT: &str = "SELECT l.id, l.name, l.street, l.city, l.state, l.zip, l.country, l.created_at, l.updated_at,
        li.id AS image_id, li.alt_text AS image_alt_text
     FROM locations l
     LEFT JOIN location_images li ON li.location_id = l.id";

pub struct Locations<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Locations<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Number of meetups (past or upcoming) held at a location
    #[instrument(skip(self), fields(location_id = %abbrev_uuid(&id)), err)]
    pub async fn count_meetups(&mut self, id: LocationId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM meetups WHERE location_id = ?")
            .bind(id)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Locations<'c> {
    type CreateRequest = LocationCreateDBRequest;
    type UpdateRequest = LocationUpdateDBRequest;
    type Response = LocationDBResponse;
    type Id = LocationId;
    type Filter = LocationFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO locations (id, name, street, city, state, zip, country, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.street)
        .bind(&request.city)
        .bind(&request.state)
        .bind(&request.zip)
        .bind(&request.country)
        .bind(now)
        .bind(now)
        .execute(&mut *self.db)
        .await?;

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), fields(location_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let location = sqlx::query_as::<_, Location>(&format!("{LOCATION_SELECT} WHERE l.id = ?"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(location.map(Into::into))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(format!("{LOCATION_SELECT} WHERE l.id IN ("));
        let mut separated = query.separated(", ");
        for id in &ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let locations = query.build_query_as::<Location>().fetch_all(&mut *self.db).await?;
        Ok(locations.into_iter().map(|l| (l.id, l.into())).collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::<Sqlite>::new(LOCATION_SELECT);
        filter.push_conditions(&mut query);
        query
            .push(" ORDER BY l.name ASC, l.id LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.skip);

        let locations = query.build_query_as::<Location>().fetch_all(&mut *self.db).await?;
        Ok(locations.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, filter), err)]
    async fn count(&mut self, filter: &Self::Filter) -> Result<i64> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM locations l");
        filter.push_conditions(&mut query);
        let count = query.build_query_scalar::<i64>().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    #[instrument(skip(self), fields(location_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM locations WHERE id = ?")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(location_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let result = sqlx::query(
            "UPDATE locations SET
                name = COALESCE(?, name),
                street = COALESCE(?, street),
                city = COALESCE(?, city),
                state = COALESCE(?, state),
                zip = COALESCE(?, zip),
                country = COALESCE(?, country),
                updated_at = ?
             WHERE id = ?",
        )
        .bind(&request.name)
        .bind(&request.street)
        .bind(&request.city)
        .bind(&request.state)
        .bind(&request.zip)
        .bind(&request.country)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }
}
