use std::collections::HashMap;

use crate::{
    AppState,
    api::models::{
        locations::{LocationResponse, LocationSummary},
        meetups::{
            ListMeetupsQuery, MeetupCreate, MeetupDetailResponse, MeetupListItem, MeetupResponse, MeetupUpdate,
            OwnerMeetupResponse, ParticipantResponse,
        },
        pagination::{PaginatedResponse, Pagination},
        topics::TopicResponse,
        users::{CurrentUser, OwnerSummary},
    },
    auth::permissions::{RequiresPermission, operation, require_own_or_any, resource},
    db::{
        handlers::{
            Locations, Meetups, Participants, Repository, Topics, Users,
            meetups::{MeetupFilter, StartOrder},
        },
        models::meetups::{MeetupCreateDBRequest, MeetupDBResponse, MeetupUpdateDBRequest},
    },
    errors::{Error, Result},
    scheduling::{Schedule, time_ago},
    types::{Action, LocationId, MeetupId, Resource, abbrev_uuid},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use sqlx::SqliteConnection;

async fn find_meetup(conn: &mut SqliteConnection, id: MeetupId) -> Result<MeetupDBResponse> {
    Meetups::new(conn).get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Meetup".to_string(),
        id: id.to_string(),
    })
}

/// Meetups may only point at existing locations; a bad id is the caller's mistake, not a 404
async fn ensure_location_exists(conn: &mut SqliteConnection, id: LocationId) -> Result<()> {
    if Locations::new(conn).get_by_id(id).await?.is_none() {
        return Err(Error::BadRequest {
            message: "Location not found".to_string(),
        });
    }
    Ok(())
}

async fn topics_of(conn: &mut SqliteConnection, id: MeetupId) -> Result<Vec<TopicResponse>> {
    Ok(Topics::new(conn)
        .for_meetups(&[id])
        .await?
        .remove(&id)
        .unwrap_or_default()
        .into_iter()
        .map(TopicResponse::from)
        .collect())
}

/// Attach locations, owners, participant counts and topics to a page of meetups
async fn list_items(conn: &mut SqliteConnection, meetups: Vec<MeetupDBResponse>) -> Result<Vec<MeetupListItem>> {
    let ids: Vec<_> = meetups.iter().map(|m| m.id).collect();
    let locations = Locations::new(conn).get_bulk(meetups.iter().map(|m| m.location_id).collect()).await?;
    let owners = Users::new(conn).get_bulk(meetups.iter().map(|m| m.owner_id).collect()).await?;
    let counts = Participants::new(conn).count_for_meetups(&ids).await?;
    let mut topics = Topics::new(conn).for_meetups(&ids).await?;

    let mut items = Vec::with_capacity(meetups.len());
    for meetup in meetups {
        let (Some(location), Some(owner)) = (locations.get(&meetup.location_id), owners.get(&meetup.owner_id)) else {
            continue;
        };
        items.push(MeetupListItem {
            id: meetup.id,
            title: meetup.title,
            description: meetup.description,
            start_time: meetup.start_time,
            end_time: meetup.end_time,
            location: LocationSummary::from(location),
            owner: OwnerSummary::from(owner),
            participant_count: counts.get(&meetup.id).copied().unwrap_or(0),
            topics: topics
                .remove(&meetup.id)
                .unwrap_or_default()
                .into_iter()
                .map(TopicResponse::from)
                .collect(),
        });
    }
    Ok(items)
}

#[utoipa::path(
    get,
    path = "/meetups",
    tag = "meetups",
    summary = "Explore meetups",
    params(ListMeetupsQuery),
    responses(
        (status = 200, description = "Paginated list of meetups, soonest first", body = PaginatedResponse<MeetupListItem>),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_meetups(
    State(state): State<AppState>,
    Query(query): Query<ListMeetupsQuery>,
) -> Result<Json<PaginatedResponse<MeetupListItem>>> {
    let (skip, limit) = query.pagination.params();
    let filter = MeetupFilter {
        location_id: query.location_id,
        starts_from: query.upcoming.unwrap_or(false).then(Utc::now),
        order: StartOrder::Ascending,
        ..MeetupFilter::new(skip, limit).with_search(query.search)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Meetups::new(&mut conn);
    let meetups = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;
    let items = list_items(&mut conn, meetups).await?;

    Ok(Json(PaginatedResponse::new(items, total_count, skip, limit)))
}

#[utoipa::path(
    get,
    path = "/meetups/{id}",
    tag = "meetups",
    summary = "Get a meetup",
    params(
        ("id" = uuid::Uuid, Path, description = "Meetup ID"),
    ),
    responses(
        (status = 200, description = "The meetup with its location, owner and participants", body = MeetupDetailResponse),
        (status = 404, description = "Meetup not found"),
    )
)]
#[tracing::instrument(skip_all, fields(meetup_id = %abbrev_uuid(&id)))]
pub async fn get_meetup(State(state): State<AppState>, Path(id): Path<MeetupId>) -> Result<Json<MeetupDetailResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let meetup = find_meetup(&mut conn, id).await?;

    let location = Locations::new(&mut conn)
        .get_by_id(meetup.location_id)
        .await?
        .ok_or_else(|| Error::Internal {
            operation: format!("load location {} of meetup {}", meetup.location_id, meetup.id),
        })?;
    let owner = Users::new(&mut conn)
        .get_by_id(meetup.owner_id)
        .await?
        .ok_or_else(|| Error::Internal {
            operation: format!("load owner {} of meetup {}", meetup.owner_id, meetup.id),
        })?;
    let participants = Participants::new(&mut conn)
        .list_for_meetups(&[id])
        .await?
        .remove(&id)
        .unwrap_or_default();
    let topics = topics_of(&mut conn, id).await?;

    Ok(Json(MeetupDetailResponse {
        id: meetup.id,
        title: meetup.title,
        description: meetup.description,
        start_time: meetup.start_time,
        end_time: meetup.end_time,
        created_at: meetup.created_at,
        updated_at: meetup.updated_at,
        time_ago: time_ago(meetup.updated_at, Utc::now()),
        owner: OwnerSummary::from(&owner),
        location: LocationResponse::from(location),
        participants: participants.into_iter().map(ParticipantResponse::from).collect(),
        topics,
    }))
}

#[utoipa::path(
    post,
    path = "/meetups",
    tag = "meetups",
    summary = "Host a meetup",
    request_body = MeetupCreate,
    responses(
        (status = 201, description = "Meetup created", body = MeetupResponse),
        (status = 400, description = "Invalid meetup"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(
        ("CookieAuth" = []),
        ("ProxyHeader" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_meetup(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Meetups, operation::CreateOwn>,
    Json(request): Json<MeetupCreate>,
) -> Result<(StatusCode, Json<MeetupResponse>)> {
    request.validate()?;
    let schedule = Schedule::new(&state.config.scheduling);
    let (start_time, end_time) = schedule
        .validate_meetup_window(request.start_time, request.end_time, Utc::now())
        .map_err(|message| Error::BadRequest { message })?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    ensure_location_exists(&mut tx, request.location_id).await?;

    let topics = Topics::new(&mut tx)
        .get_or_create_by_names(&request.topics.unwrap_or_default())
        .await?;

    let meetup = Meetups::new(&mut tx)
        .create(&MeetupCreateDBRequest {
            title: request.title.trim().to_string(),
            description: request.description.trim().to_string(),
            start_time,
            end_time,
            location_id: request.location_id,
            owner_id: current_user.id,
            topic_ids: topics.iter().map(|t| t.id).collect(),
        })
        .await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    tracing::info!(meetup_id = %meetup.id, owner_id = %current_user.id, "Created meetup");
    let topics = topics.into_iter().map(TopicResponse::from).collect();
    Ok((StatusCode::CREATED, Json(MeetupResponse::new(meetup, topics))))
}

#[utoipa::path(
    patch,
    path = "/meetups/{id}",
    tag = "meetups",
    summary = "Update a meetup",
    request_body = MeetupUpdate,
    params(
        ("id" = uuid::Uuid, Path, description = "Meetup ID"),
    ),
    responses(
        (status = 200, description = "Meetup updated", body = MeetupResponse),
        (status = 400, description = "Invalid meetup"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Meetup not found"),
    ),
    security(
        ("CookieAuth" = []),
        ("ProxyHeader" = [])
    )
)]
#[tracing::instrument(skip_all, fields(meetup_id = %abbrev_uuid(&id)))]
pub async fn update_meetup(
    State(state): State<AppState>,
    Path(id): Path<MeetupId>,
    current_user: CurrentUser,
    Json(update): Json<MeetupUpdate>,
) -> Result<Json<MeetupResponse>> {
    update.validate()?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let existing = find_meetup(&mut tx, id).await?;
    require_own_or_any(&current_user, Resource::Meetups, Action::Update, existing.owner_id)?;

    if let Some(location_id) = update.location_id {
        ensure_location_exists(&mut tx, location_id).await?;
    }

    // Re-check the window only when the times move. A new start without an end gets the default length.
    let (start_time, end_time) = match (update.start_time, update.end_time) {
        (None, None) => (None, None),
        (start, end) => {
            let start = start.unwrap_or(existing.start_time);
            let end = end.or_else(|| update.start_time.is_none().then_some(existing.end_time));
            let (start, end) = Schedule::new(&state.config.scheduling)
                .validate_meetup_window(start, end, Utc::now())
                .map_err(|message| Error::BadRequest { message })?;
            (Some(start), Some(end))
        }
    };

    let topic_ids = match &update.topics {
        Some(names) => Some(
            Topics::new(&mut tx)
                .get_or_create_by_names(names)
                .await?
                .into_iter()
                .map(|t| t.id)
                .collect(),
        ),
        None => None,
    };

    let meetup = Meetups::new(&mut tx)
        .update(
            id,
            &MeetupUpdateDBRequest {
                title: update.title.map(|t| t.trim().to_string()),
                description: update.description.map(|d| d.trim().to_string()),
                start_time,
                end_time,
                location_id: update.location_id,
                topic_ids,
            },
        )
        .await?;
    let topics = topics_of(&mut tx, id).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(MeetupResponse::new(meetup, topics)))
}

#[utoipa::path(
    delete,
    path = "/meetups/{id}",
    tag = "meetups",
    summary = "Delete a meetup",
    params(
        ("id" = uuid::Uuid, Path, description = "Meetup ID"),
    ),
    responses(
        (status = 204, description = "Meetup deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Meetup not found"),
    ),
    security(
        ("CookieAuth" = []),
        ("ProxyHeader" = [])
    )
)]
#[tracing::instrument(skip_all, fields(meetup_id = %abbrev_uuid(&id)))]
pub async fn delete_meetup(State(state): State<AppState>, Path(id): Path<MeetupId>, current_user: CurrentUser) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let meetup = find_meetup(&mut conn, id).await?;
    require_own_or_any(&current_user, Resource::Meetups, Action::Delete, meetup.owner_id)?;

    Meetups::new(&mut conn).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/meetups/{id}/participants",
    tag = "meetups",
    summary = "Join a meetup",
    params(
        ("id" = uuid::Uuid, Path, description = "Meetup ID"),
    ),
    responses(
        (status = 201, description = "Joined", body = ParticipantResponse),
        (status = 400, description = "Already joined"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Meetup not found"),
    ),
    security(
        ("CookieAuth" = []),
        ("ProxyHeader" = [])
    )
)]
#[tracing::instrument(skip_all, fields(meetup_id = %abbrev_uuid(&id)))]
pub async fn join_meetup(
    State(state): State<AppState>,
    Path(id): Path<MeetupId>,
    current_user: CurrentUser,
) -> Result<(StatusCode, Json<ParticipantResponse>)> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    find_meetup(&mut conn, id).await?;

    let participant = Participants::new(&mut conn)
        .add(id, current_user.id)
        .await?
        .ok_or_else(|| Error::BadRequest {
            message: "You have already joined this meetup".to_string(),
        })?;

    Ok((StatusCode::CREATED, Json(ParticipantResponse::from(participant))))
}

#[utoipa::path(
    delete,
    path = "/meetups/{id}/participants",
    tag = "meetups",
    summary = "Leave a meetup",
    params(
        ("id" = uuid::Uuid, Path, description = "Meetup ID"),
    ),
    responses(
        (status = 204, description = "Left"),
        (status = 400, description = "Not a participant"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Meetup not found"),
    ),
    security(
        ("CookieAuth" = []),
        ("ProxyHeader" = [])
    )
)]
#[tracing::instrument(skip_all, fields(meetup_id = %abbrev_uuid(&id)))]
pub async fn leave_meetup(State(state): State<AppState>, Path(id): Path<MeetupId>, current_user: CurrentUser) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    find_meetup(&mut conn, id).await?;

    if !Participants::new(&mut conn).remove(id, current_user.id).await? {
        return Err(Error::BadRequest {
            message: "You have not joined this meetup".to_string(),
        });
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/users/{username}/meetups",
    tag = "meetups",
    summary = "List a host's meetups",
    params(
        ("username" = String, Path, description = "Owner's username"),
        Pagination,
    ),
    responses(
        (status = 200, description = "The owner's meetups, latest first", body = PaginatedResponse<OwnerMeetupResponse>),
        (status = 404, description = "Owner not found"),
    )
)]
#[tracing::instrument(skip_all, fields(username = %username))]
pub async fn list_owner_meetups(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<OwnerMeetupResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let owner = Users::new(&mut conn)
        .get_user_by_username(&username)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Owner".to_string(),
            id: username.clone(),
        })?;

    let (skip, limit) = pagination.params();
    let filter = MeetupFilter {
        owner_id: Some(owner.id),
        order: StartOrder::Descending,
        ..MeetupFilter::new(skip, limit)
    };
    let mut repo = Meetups::new(&mut conn);
    let meetups = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;

    let locations: HashMap<_, _> = Locations::new(&mut conn)
        .get_bulk(meetups.iter().map(|m| m.location_id).collect())
        .await?;
    let data = meetups
        .into_iter()
        .filter_map(|meetup| {
            let location = locations.get(&meetup.location_id)?;
            Some(OwnerMeetupResponse {
                id: meetup.id,
                title: meetup.title,
                description: meetup.description,
                created_at: meetup.created_at,
                start_time: meetup.start_time,
                location: LocationSummary::from(location),
            })
        })
        .collect();

    Ok(Json(PaginatedResponse::new(data, total_count, skip, limit)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::roles::names;
    use crate::test_utils::{
        add_auth_headers, create_test_admin_user, create_test_app, create_test_location, create_test_meetup, create_test_user,
    };
    use chrono::{DateTime, Duration, Timelike};
    use sqlx::SqlitePool;

    /// Tomorrow at 10:00 UTC, safely inside the booking window
    fn tomorrow_morning() -> DateTime<Utc> {
        (Utc::now() + Duration::days(1))
            .with_hour(10)
            .and_then(|t| t.with_minute(0))
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap()
    }

    fn create_request(location_id: LocationId) -> MeetupCreate {
        MeetupCreate {
            title: "Chess in the park".to_string(),
            description: "Bring a board if you have one".to_string(),
            location_id,
            start_time: tomorrow_morning(),
            end_time: None,
            topics: Some(vec![" Chess ".to_string(), "social".to_string(), "chess".to_string()]),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_meetup(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, names::USER).await;
        let location = create_test_location(&pool, "Cafe Luna").await;
        let (header, value) = &add_auth_headers(&user)[0];

        let response = server
            .post("/api/v1/meetups")
            .add_header(header, value)
            .json(&create_request(location.id))
            .await;
        response.assert_status(StatusCode::CREATED);

        let meetup: MeetupResponse = response.json();
        assert_eq!(meetup.owner_id, user.id);
        assert_eq!(meetup.end_time - meetup.start_time, Duration::minutes(30));
        let topics: Vec<_> = meetup.topics.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(topics, vec!["chess", "social"]);

        // "chess" is now a known topic
        let topics: Vec<TopicResponse> = server.get("/api/v1/topics").await.json();
        assert!(topics.iter().any(|t| t.name == "chess"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_meetup_validation(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, names::USER).await;
        let location = create_test_location(&pool, "Cafe Luna").await;
        let (header, value) = &add_auth_headers(&user)[0];

        let mut request = create_request(location.id);
        request.title = "Hi".to_string();
        let response = server.post("/api/v1/meetups").add_header(header, value).json(&request).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.text(), "Title must be at least 3 characters.");

        let mut request = create_request(location.id);
        request.start_time = Utc::now() - Duration::hours(1);
        server
            .post("/api/v1/meetups")
            .add_header(header, value)
            .json(&request)
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let mut request = create_request(location.id);
        request.start_time = Utc::now() + Duration::days(120);
        server
            .post("/api/v1/meetups")
            .add_header(header, value)
            .json(&request)
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let mut request = create_request(location.id);
        request.end_time = Some(request.start_time - Duration::minutes(30));
        server
            .post("/api/v1/meetups")
            .add_header(header, value)
            .json(&request)
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let response = server
            .post("/api/v1/meetups")
            .add_header(header, value)
            .json(&create_request(uuid::Uuid::new_v4()))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.text(), "Location not found");

        server
            .post("/api/v1/meetups")
            .json(&create_request(location.id))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_explore_meetups(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        let owner = create_test_user(&pool, names::USER).await;
        let luna = create_test_location(&pool, "Cafe Luna").await;
        let bean = create_test_location(&pool, "Bean Scene").await;
        create_test_meetup(&pool, &owner, &luna, "Knitting circle", 3).await;
        create_test_meetup(&pool, &owner, &bean, "Chess club", 1).await;
        create_test_meetup(&pool, &owner, &luna, "Past chess", -2).await;

        let body: serde_json::Value = server.get("/api/v1/meetups").await.json();
        assert_eq!(body["total_count"], 3);
        assert_eq!(body["data"][0]["title"], "Past chess");
        assert_eq!(body["data"][1]["location"]["name"], "Bean Scene");
        assert_eq!(body["data"][1]["owner"]["username"], owner.username.as_str());
        assert_eq!(body["data"][1]["participant_count"], 0);

        let body: serde_json::Value = server.get("/api/v1/meetups").add_query_param("upcoming", "true").await.json();
        assert_eq!(body["total_count"], 2);
        assert_eq!(body["data"][0]["title"], "Chess club");

        let body: serde_json::Value = server
            .get("/api/v1/meetups")
            .add_query_param("search", "CHESS")
            .add_query_param("location_id", luna.id.to_string())
            .await
            .json();
        assert_eq!(body["total_count"], 1);
        assert_eq!(body["data"][0]["title"], "Past chess");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_meetup_detail(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        let owner = create_test_user(&pool, names::USER).await;
        let guest = create_test_user(&pool, names::USER).await;
        let location = create_test_location(&pool, "Cafe Luna").await;
        let meetup = create_test_meetup(&pool, &owner, &location, "Chess club", 1).await;

        let (header, value) = &add_auth_headers(&guest)[0];
        server
            .post(&format!("/api/v1/meetups/{}/participants", meetup.id))
            .add_header(header, value)
            .await
            .assert_status(StatusCode::CREATED);

        let response = server.get(&format!("/api/v1/meetups/{}", meetup.id)).await;
        response.assert_status_ok();
        let detail: MeetupDetailResponse = response.json();
        assert_eq!(detail.owner.username, owner.username);
        assert_eq!(detail.location.combined_address, "1 Main St, Springfield, IL 62701");
        assert_eq!(detail.participants.len(), 1);
        assert_eq!(detail.participants[0].user_id, guest.id);
        assert_eq!(detail.time_ago, "less than a minute");

        let response = server.get(&format!("/api/v1/meetups/{}", uuid::Uuid::new_v4())).await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.text(), "Meetup not found");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_meetup_permissions(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        let owner = create_test_user(&pool, names::USER).await;
        let stranger = create_test_user(&pool, names::USER).await;
        let admin = create_test_admin_user(&pool).await;
        let location = create_test_location(&pool, "Cafe Luna").await;
        let meetup = create_test_meetup(&pool, &owner, &location, "Chess club", 1).await;
        let path = format!("/api/v1/meetups/{}", meetup.id);

        let (header, value) = &add_auth_headers(&stranger)[0];
        server
            .patch(&path)
            .add_header(header, value)
            .json(&MeetupUpdate {
                title: Some("Hijacked".to_string()),
                ..Default::default()
            })
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let (header, value) = &add_auth_headers(&owner)[0];
        let response = server
            .patch(&path)
            .add_header(header, value)
            .json(&MeetupUpdate {
                title: Some("Chess and coffee".to_string()),
                topics: Some(vec!["Games".to_string()]),
                ..Default::default()
            })
            .await;
        response.assert_status_ok();
        let updated: MeetupResponse = response.json();
        assert_eq!(updated.title, "Chess and coffee");
        assert_eq!(updated.description, meetup.description);
        assert_eq!(updated.topics.len(), 1);
        assert_eq!(updated.topics[0].name, "games");

        let (header, value) = &add_auth_headers(&admin)[0];
        let new_start = tomorrow_morning() + Duration::days(1);
        let response = server
            .patch(&path)
            .add_header(header, value)
            .json(&MeetupUpdate {
                start_time: Some(new_start),
                ..Default::default()
            })
            .await;
        response.assert_status_ok();
        let updated: MeetupResponse = response.json();
        assert_eq!(updated.start_time, new_start);
        assert_eq!(updated.end_time, new_start + Duration::minutes(30));

        server
            .patch(&format!("/api/v1/meetups/{}", uuid::Uuid::new_v4()))
            .add_header(header, value)
            .json(&MeetupUpdate::default())
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_meetup(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        let owner = create_test_user(&pool, names::USER).await;
        let stranger = create_test_user(&pool, names::USER).await;
        let admin = create_test_admin_user(&pool).await;
        let location = create_test_location(&pool, "Cafe Luna").await;
        let first = create_test_meetup(&pool, &owner, &location, "First", 1).await;
        let second = create_test_meetup(&pool, &owner, &location, "Second", 2).await;

        let (header, value) = &add_auth_headers(&stranger)[0];
        server
            .delete(&format!("/api/v1/meetups/{}", first.id))
            .add_header(header, value)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let (header, value) = &add_auth_headers(&owner)[0];
        server
            .delete(&format!("/api/v1/meetups/{}", first.id))
            .add_header(header, value)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .delete(&format!("/api/v1/meetups/{}", first.id))
            .add_header(header, value)
            .await
            .assert_status(StatusCode::NOT_FOUND);

        let (header, value) = &add_auth_headers(&admin)[0];
        server
            .delete(&format!("/api/v1/meetups/{}", second.id))
            .add_header(header, value)
            .await
            .assert_status(StatusCode::NO_CONTENT);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_join_and_leave(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        let owner = create_test_user(&pool, names::USER).await;
        let guest = create_test_user(&pool, names::USER).await;
        let location = create_test_location(&pool, "Cafe Luna").await;
        let meetup = create_test_meetup(&pool, &owner, &location, "Chess club", 1).await;
        let path = format!("/api/v1/meetups/{}/participants", meetup.id);
        let (header, value) = &add_auth_headers(&guest)[0];

        let response = server.post(&path).add_header(header, value).await;
        response.assert_status(StatusCode::CREATED);
        let participant: ParticipantResponse = response.json();
        assert_eq!(participant.username, guest.username);

        let response = server.post(&path).add_header(header, value).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.text(), "You have already joined this meetup");

        server.delete(&path).add_header(header, value).await.assert_status(StatusCode::NO_CONTENT);

        let response = server.delete(&path).add_header(header, value).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.text(), "You have not joined this meetup");

        server
            .post(&format!("/api/v1/meetups/{}/participants", uuid::Uuid::new_v4()))
            .add_header(header, value)
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server.post(&path).await.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_owner_meetups(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        let owner = create_test_user(&pool, names::USER).await;
        let other = create_test_user(&pool, names::USER).await;
        let location = create_test_location(&pool, "Cafe Luna").await;
        create_test_meetup(&pool, &owner, &location, "Sooner", 1).await;
        create_test_meetup(&pool, &owner, &location, "Later", 4).await;
        create_test_meetup(&pool, &other, &location, "Someone else's", 2).await;

        let response = server.get(&format!("/api/v1/users/{}/meetups", owner.username)).await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["total_count"], 2);
        assert_eq!(body["data"][0]["title"], "Later");
        assert_eq!(body["data"][1]["title"], "Sooner");
        assert_eq!(body["data"][0]["location"]["name"], "Cafe Luna");

        let response = server.get("/api/v1/users/nobody/meetups").await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.text(), "Owner not found");
    }
}
