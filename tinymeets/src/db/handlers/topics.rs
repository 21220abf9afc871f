//! Database repository for meetup topics.

use crate::db::{errors::Result, models::topics::TopicDBResponse};
use crate::types::MeetupId;
use chrono::Utc;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, FromRow)]
struct MeetupTopicRow {
    meetup_id: MeetupId,
    #[sqlx(flatten)]
    topic: TopicDBResponse,
}

/// Trim, lowercase and dedupe topic names, dropping blanks. Order of first appearance is kept.
pub fn normalize_names(names: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    for name in names {
        let name = name.trim().to_lowercase();
        if !name.is_empty() && !normalized.contains(&name) {
            normalized.push(name);
        }
    }
    normalized
}

pub struct Topics<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Topics<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// All topics ordered by name
    #[instrument(skip(self), err)]
    pub async fn list(&mut self) -> Result<Vec<TopicDBResponse>> {
        let topics = sqlx::query_as::<_, TopicDBResponse>("SELECT id, name, created_at FROM topics ORDER BY name")
            .fetch_all(&mut *self.db)
            .await?;
        Ok(topics)
    }

    /// Look up topics by name, creating any that don't exist yet
    #[instrument(skip(self, names), fields(count = names.len()), err)]
    pub async fn get_or_create_by_names(&mut self, names: &[String]) -> Result<Vec<TopicDBResponse>> {
        let names = normalize_names(names);
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        for name in &names {
            sqlx::query("INSERT INTO topics (id, name, created_at) VALUES (?, ?, ?) ON CONFLICT (name) DO NOTHING")
                .bind(Uuid::new_v4())
                .bind(name)
                .bind(now)
                .execute(&mut *self.db)
                .await?;
        }

        let mut query = QueryBuilder::<Sqlite>::new("SELECT id, name, created_at FROM topics WHERE name IN (");
        let mut separated = query.separated(", ");
        for name in &names {
            separated.push_bind(name.clone());
        }
        separated.push_unseparated(") ORDER BY name");

        let topics = query.build_query_as::<TopicDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(topics)
    }

    /// Topics of each given meetup, ordered by name
    #[instrument(skip(self, meetup_ids), fields(count = meetup_ids.len()), err)]
    pub async fn for_meetups(&mut self, meetup_ids: &[MeetupId]) -> Result<HashMap<MeetupId, Vec<TopicDBResponse>>> {
        if meetup_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT mt.meetup_id, t.id, t.name, t.created_at
             FROM meetup_topics mt JOIN topics t ON t.id = mt.topic_id
             WHERE mt.meetup_id IN (",
        );
        let mut separated = query.separated(", ");
        for id in meetup_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY t.name");

        let rows = query.build_query_as::<MeetupTopicRow>().fetch_all(&mut *self.db).await?;
        let mut by_meetup: HashMap<MeetupId, Vec<TopicDBResponse>> = HashMap::new();
        for row in rows {
            by_meetup.entry(row.meetup_id).or_default().push(row.topic);
        }
        Ok(by_meetup)
    }
}
