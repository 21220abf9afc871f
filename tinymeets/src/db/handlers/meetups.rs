//! Database repository for meetups.

use crate::db::{
    errors::{DbError, Result},
    handlers::{repository::Repository, substring_pattern},
    models::meetups::{MeetupCreateDBRequest, MeetupDBResponse, MeetupUpdateDBRequest},
};
use crate::types::{LocationId, MeetupId, TopicId, UserId, abbrev_uuid};
use chrono::{DateTime, Utc};
use sqlx::{Connection, QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

/// Sort order on start time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartOrder {
    /// Soonest first
    #[default]
    Ascending,
    /// Latest first
    Descending,
}

/// Filter for listing meetups
#[derive(Debug, Clone, Default)]
pub struct MeetupFilter {
    pub skip: i64,
    pub limit: i64,
    /// Case-insensitive substring match on title or description
    pub search: Option<String>,
    pub location_id: Option<LocationId>,
    pub owner_id: Option<UserId>,
    /// Only meetups starting at or after this instant
    pub starts_from: Option<DateTime<Utc>>,
    pub order: StartOrder,
}

impl MeetupFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search.filter(|s| !s.trim().is_empty());
        self
    }

    fn push_conditions<'a>(&'a self, query: &mut QueryBuilder<'a, Sqlite>) {
        query.push(" WHERE 1 = 1");
        if let Some(search) = &self.search {
            let pattern = substring_pattern(search);
            query
                .push(" AND (lower(title) LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR lower(description) LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
        if let Some(location_id) = self.location_id {
            query.push(" AND location_id = ").push_bind(location_id);
        }
        if let Some(owner_id) = self.owner_id {
            query.push(" AND owner_id = ").push_bind(owner_id);
        }
        if let Some(starts_from) = self.starts_from {
            query.push(" AND start_time >= ").push_bind(starts_from);
        }
    }
}

const MEETUP_COLUMNS: &str = "id, title, description, start_time, end_time, location_id, owner_id, created_at, updated_at";

async fn replace_topics(conn: &mut SqliteConnection, meetup_id: MeetupId, topic_ids: &[TopicId]) -> Result<()> {
    sqlx::query("DELETE FROM meetup_topics WHERE meetup_id = ?")
        .bind(meetup_id)
        .execute(&mut *conn)
        .await?;

    for topic_id in topic_ids {
        sqlx::query("INSERT OR IGNORE INTO meetup_topics (meetup_id, topic_id) VALUES (?, ?)")
            .bind(meetup_id)
            .bind(topic_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub struct Meetups<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Meetups<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Meetups<'c> {
    type CreateRequest = MeetupCreateDBRequest;
    type UpdateRequest = MeetupUpdateDBRequest;
    type Response = MeetupDBResponse;
    type Id = MeetupId;
    type Filter = MeetupFilter;

    #[instrument(skip(self, request), fields(title = %request.title, owner_id = %abbrev_uuid(&request.owner_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let mut tx = self.db.begin().await?;
        let meetup = sqlx::query_as::<_, MeetupDBResponse>(&format!(
            "INSERT INTO meetups (id, title, description, start_time, end_time, location_id, owner_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {MEETUP_COLUMNS}"
        ))
        .bind(id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.start_time)
        .bind(request.end_time)
        .bind(request.location_id)
        .bind(request.owner_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        replace_topics(&mut tx, id, &request.topic_ids).await?;
        tx.commit().await?;

        Ok(meetup)
    }

    #[instrument(skip(self), fields(meetup_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let meetup = sqlx::query_as::<_, MeetupDBResponse>(&format!("SELECT {MEETUP_COLUMNS} FROM meetups WHERE id = ?"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(meetup)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {MEETUP_COLUMNS} FROM meetups WHERE id IN ("));
        let mut separated = query.separated(", ");
        for id in &ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let meetups = query.build_query_as::<MeetupDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(meetups.into_iter().map(|m| (m.id, m)).collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {MEETUP_COLUMNS} FROM meetups"));
        filter.push_conditions(&mut query);
        query.push(match filter.order {
            StartOrder::Ascending => " ORDER BY start_time ASC, id",
            StartOrder::Descending => " ORDER BY start_time DESC, id",
        });
        query
            .push(" LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.skip);

        let meetups = query.build_query_as::<MeetupDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(meetups)
    }

    #[instrument(skip(self, filter), err)]
    async fn count(&mut self, filter: &Self::Filter) -> Result<i64> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM meetups");
        filter.push_conditions(&mut query);
        let count = query.build_query_scalar::<i64>().fetch_one(&mut *self.db).await?;
        Ok(count)
    }

    #[instrument(skip(self), fields(meetup_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM meetups WHERE id = ?")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(meetup_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut tx = self.db.begin().await?;

        let meetup = sqlx::query_as::<_, MeetupDBResponse>(&format!(
            "UPDATE meetups SET
                title = COALESCE(?, title),
                description = COALESCE(?, description),
                start_time = COALESCE(?, start_time),
                end_time = COALESCE(?, end_time),
                location_id = COALESCE(?, location_id),
                updated_at = ?
             WHERE id = ?
             RETURNING {MEETUP_COLUMNS}"
        ))
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.start_time)
        .bind(request.end_time)
        .bind(request.location_id)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;

        if let Some(topic_ids) = &request.topic_ids {
            replace_topics(&mut tx, id, topic_ids).await?;
        }
        tx.commit().await?;

        Ok(meetup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::{Locations, Topics, Users};
    use crate::db::models::{locations::LocationCreateDBRequest, users::UserCreateDBRequest};
    use chrono::Duration;
    use sqlx::SqlitePool;

    async fn fixtures(conn: &mut SqliteConnection) -> (UserId, LocationId) {
        let owner = Users::new(&mut *conn)
            .create(&UserCreateDBRequest {
                email: "host@example.com".to_string(),
                username: "host".to_string(),
                name: Some("Host".to_string()),
                password_hash: None,
                auth_source: "test".to_string(),
                roles: vec!["user".to_string()],
            })
            .await
            .unwrap();
        let location = Locations::new(&mut *conn)
            .create(&LocationCreateDBRequest {
                name: "Cafe Uno".to_string(),
                street: "1 Main St".to_string(),
                city: "Springfield".to_string(),
                state: "IL".to_string(),
                zip: "62701".to_string(),
                country: "USA".to_string(),
            })
            .await
            .unwrap();
        (owner.id, location.id)
    }

    fn meetup_request(title: &str, owner_id: UserId, location_id: LocationId, start: DateTime<Utc>) -> MeetupCreateDBRequest {
        MeetupCreateDBRequest {
            title: title.to_string(),
            description: "A friendly chat over coffee".to_string(),
            start_time: start,
            end_time: start + Duration::minutes(30),
            location_id,
            owner_id,
            topic_ids: vec![],
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_with_topics(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let (owner_id, location_id) = fixtures(&mut conn).await;
        let topics = Topics::new(&mut conn)
            .get_or_create_by_names(&["tech".to_string(), "rust".to_string()])
            .await
            .unwrap();

        let start = Utc::now() + Duration::days(1);
        let mut request = meetup_request("Rustaceans", owner_id, location_id, start);
        request.topic_ids = topics.iter().map(|t| t.id).collect();

        let meetup = Meetups::new(&mut conn).create(&request).await.unwrap();
        assert_eq!(meetup.title, "Rustaceans");
        assert_eq!(meetup.owner_id, owner_id);
        assert_eq!(meetup.start_time, start);

        let by_meetup = Topics::new(&mut conn).for_meetups(&[meetup.id]).await.unwrap();
        let mut names: Vec<_> = by_meetup[&meetup.id].iter().map(|t| t.name.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["rust", "tech"]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_filters_and_order(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let (owner_id, location_id) = fixtures(&mut conn).await;
        let now = Utc::now();

        let mut repo = Meetups::new(&mut conn);
        repo.create(&meetup_request("Yesterday's Chess", owner_id, location_id, now - Duration::days(1)))
            .await
            .unwrap();
        repo.create(&meetup_request("Board Games", owner_id, location_id, now + Duration::days(2)))
            .await
            .unwrap();
        repo.create(&meetup_request("Morning Chess", owner_id, location_id, now + Duration::days(1)))
            .await
            .unwrap();

        let all = repo.list(&MeetupFilter::new(0, 10)).await.unwrap();
        let titles: Vec<_> = all.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Yesterday's Chess", "Morning Chess", "Board Games"]);

        let upcoming = MeetupFilter {
            starts_from: Some(now),
            ..MeetupFilter::new(0, 10)
        };
        assert_eq!(repo.count(&upcoming).await.unwrap(), 2);

        let chess = MeetupFilter::new(0, 10).with_search(Some("CHESS".to_string()));
        assert_eq!(repo.count(&chess).await.unwrap(), 2);

        let newest_first = MeetupFilter {
            owner_id: Some(owner_id),
            order: StartOrder::Descending,
            ..MeetupFilter::new(0, 10)
        };
        let titles: Vec<_> = repo
            .list(&newest_first)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(titles, vec!["Board Games", "Morning Chess", "Yesterday's Chess"]);

        let elsewhere = MeetupFilter {
            location_id: Some(Uuid::new_v4()),
            ..MeetupFilter::new(0, 10)
        };
        assert_eq!(repo.count(&elsewhere).await.unwrap(), 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_and_replace_topics(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let (owner_id, location_id) = fixtures(&mut conn).await;
        let social = Topics::new(&mut conn)
            .get_or_create_by_names(&["social".to_string()])
            .await
            .unwrap();

        let created = Meetups::new(&mut conn)
            .create(&meetup_request("Draft", owner_id, location_id, Utc::now() + Duration::days(1)))
            .await
            .unwrap();

        let updated = Meetups::new(&mut conn)
            .update(
                created.id,
                &MeetupUpdateDBRequest {
                    title: Some("Final".to_string()),
                    topic_ids: Some(social.iter().map(|t| t.id).collect()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Final");
        assert_eq!(updated.description, created.description);

        let topics = Topics::new(&mut conn).for_meetups(&[created.id]).await.unwrap();
        assert_eq!(topics[&created.id].len(), 1);
        assert_eq!(topics[&created.id][0].name, "social");

        let missing = Meetups::new(&mut conn)
            .update(Uuid::new_v4(), &MeetupUpdateDBRequest::default())
            .await;
        assert!(matches!(missing, Err(DbError::NotFound)));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_location_with_meetups_cannot_be_deleted(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let (owner_id, location_id) = fixtures(&mut conn).await;
        let meetup = Meetups::new(&mut conn)
            .create(&meetup_request("Anchor", owner_id, location_id, Utc::now() + Duration::hours(3)))
            .await
            .unwrap();

        assert_eq!(Locations::new(&mut conn).count_meetups(location_id).await.unwrap(), 1);
        let result = Locations::new(&mut conn).delete(location_id).await;
        assert!(matches!(result, Err(DbError::ForeignKeyViolation { .. })));

        assert!(Meetups::new(&mut conn).delete(meetup.id).await.unwrap());
        assert!(Locations::new(&mut conn).delete(location_id).await.unwrap());
    }
}
