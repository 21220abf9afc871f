//! Database repository for meetup participants.

use crate::db::{errors::Result, models::participants::ParticipantDBResponse};
use crate::types::{MeetupId, ParticipantId, UserId, abbrev_uuid};
use chrono::Utc;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

const PARTICIPANT_SELECT: &str = "SELECT mp.id, mp.meetup_id, mp.user_id, u.username, u.name, mp.created_at
     FROM meetup_participants mp
     JOIN users u ON u.id = mp.user_id";

#[derive(Debug, FromRow)]
struct ParticipantCount {
    meetup_id: MeetupId,
    count: i64,
}

pub struct Participants<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Participants<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Add a user to a meetup. Returns `None` if they had already joined.
    #[instrument(skip(self), fields(meetup_id = %abbrev_uuid(&meetup_id), user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn add(&mut self, meetup_id: MeetupId, user_id: UserId) -> Result<Option<ParticipantDBResponse>> {
        let inserted: Option<ParticipantId> = sqlx::query_scalar(
            "INSERT INTO meetup_participants (id, meetup_id, user_id, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (meetup_id, user_id) DO NOTHING
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(meetup_id)
        .bind(user_id)
        .bind(Utc::now())
        .fetch_optional(&mut *self.db)
        .await?;

        let Some(id) = inserted else {
            return Ok(None);
        };

        let participant = sqlx::query_as::<_, ParticipantDBResponse>(&format!("{PARTICIPANT_SELECT} WHERE mp.id = ?"))
            .bind(id)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(Some(participant))
    }

    /// Remove a user from a meetup. Returns false if they were not a participant.
    #[instrument(skip(self), fields(meetup_id = %abbrev_uuid(&meetup_id), user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn remove(&mut self, meetup_id: MeetupId, user_id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM meetup_participants WHERE meetup_id = ? AND user_id = ?")
            .bind(meetup_id)
            .bind(user_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Participants of each given meetup, in join order
    #[instrument(skip(self, meetup_ids), fields(count = meetup_ids.len()), err)]
    pub async fn list_for_meetups(&mut self, meetup_ids: &[MeetupId]) -> Result<HashMap<MeetupId, Vec<ParticipantDBResponse>>> {
        if meetup_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(format!("{PARTICIPANT_SELECT} WHERE mp.meetup_id IN ("));
        let mut separated = query.separated(", ");
        for id in meetup_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY mp.created_at, mp.id");

        let rows = query.build_query_as::<ParticipantDBResponse>().fetch_all(&mut *self.db).await?;
        let mut by_meetup: HashMap<MeetupId, Vec<ParticipantDBResponse>> = HashMap::new();
        for row in rows {
            by_meetup.entry(row.meetup_id).or_default().push(row);
        }
        Ok(by_meetup)
    }

    /// Number of participants per meetup. Meetups nobody joined are absent.
    #[instrument(skip(self, meetup_ids), fields(count = meetup_ids.len()), err)]
    pub async fn count_for_meetups(&mut self, meetup_ids: &[MeetupId]) -> Result<HashMap<MeetupId, i64>> {
        if meetup_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query =
            QueryBuilder::<Sqlite>::new("SELECT meetup_id, COUNT(*) AS count FROM meetup_participants WHERE meetup_id IN (");
        let mut separated = query.separated(", ");
        for id in meetup_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") GROUP BY meetup_id");

        let rows = query.build_query_as::<ParticipantCount>().fetch_all(&mut *self.db).await?;
        Ok(rows.into_iter().map(|r| (r.meetup_id, r.count)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::{Locations, Meetups, Repository, Users};
    use crate::db::models::{locations::LocationCreateDBRequest, meetups::MeetupCreateDBRequest, users::UserCreateDBRequest};
    use chrono::Duration;
    use sqlx::SqlitePool;

    async fn create_user(conn: &mut SqliteConnection, username: &str) -> UserId {
        Users::new(conn)
            .create(&UserCreateDBRequest {
                email: format!("{username}@example.com"),
                username: username.to_string(),
                name: Some(username.to_uppercase()),
                password_hash: None,
                auth_source: "test".to_string(),
                roles: vec!["user".to_string()],
            })
            .await
            .unwrap()
            .id
    }

    async fn create_meetup(conn: &mut SqliteConnection, owner_id: UserId) -> MeetupId {
        let location = Locations::new(&mut *conn)
            .create(&LocationCreateDBRequest {
                name: "Corner Cup".to_string(),
                street: "3 Elm St".to_string(),
                city: "Ogdenville".to_string(),
                state: "IL".to_string(),
                zip: "60000".to_string(),
                country: "USA".to_string(),
            })
            .await
            .unwrap();
        let start = Utc::now() + Duration::days(1);
        Meetups::new(&mut *conn)
            .create(&MeetupCreateDBRequest {
                title: "Coffee".to_string(),
                description: "Talking about coffee".to_string(),
                start_time: start,
                end_time: start + Duration::minutes(30),
                location_id: location.id,
                owner_id,
                topic_ids: vec![],
            })
            .await
            .unwrap()
            .id
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_join_and_leave(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let owner = create_user(&mut conn, "owner").await;
        let guest = create_user(&mut conn, "guest").await;
        let meetup_id = create_meetup(&mut conn, owner).await;

        let mut repo = Participants::new(&mut conn);
        let joined = repo.add(meetup_id, guest).await.unwrap().unwrap();
        assert_eq!(joined.user_id, guest);
        assert_eq!(joined.username, "guest");
        assert_eq!(joined.name.as_deref(), Some("GUEST"));
        assert_eq!(repo.count_for_meetups(&[meetup_id]).await.unwrap().get(&meetup_id).copied(), Some(1));

        // Joining twice is a no-op
        assert!(repo.add(meetup_id, guest).await.unwrap().is_none());

        assert!(repo.remove(meetup_id, guest).await.unwrap());
        assert!(!repo.remove(meetup_id, guest).await.unwrap());
        assert_eq!(repo.count_for_meetups(&[meetup_id]).await.unwrap().get(&meetup_id).copied().unwrap_or(0), 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_and_count_for_meetups(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let owner = create_user(&mut conn, "owner").await;
        let alice = create_user(&mut conn, "alice").await;
        let bob = create_user(&mut conn, "bob").await;
        let busy = create_meetup(&mut conn, owner).await;
        let empty = create_meetup(&mut conn, owner).await;

        let mut repo = Participants::new(&mut conn);
        repo.add(busy, alice).await.unwrap();
        repo.add(busy, bob).await.unwrap();

        let listed = repo.list_for_meetups(&[busy, empty]).await.unwrap();
        let usernames: Vec<_> = listed[&busy].iter().map(|p| p.username.as_str()).collect();
        assert_eq!(usernames, vec!["alice", "bob"]);
        assert!(!listed.contains_key(&empty));

        let counts = repo.count_for_meetups(&[busy, empty]).await.unwrap();
        assert_eq!(counts.get(&busy), Some(&2));
        assert_eq!(counts.get(&empty), None);

        assert!(repo.list_for_meetups(&[]).await.unwrap().is_empty());
    }
}
