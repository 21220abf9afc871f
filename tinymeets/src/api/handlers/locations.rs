//! Venue management. Anyone may browse; only admins may change locations.

use crate::{
    AppState,
    api::models::{
        locations::{
            ListLocationsQuery, LocationCreate, LocationCreateForm, LocationDetailResponse, LocationImageForm, LocationResponse,
            LocationUpdate, UpcomingMeetup,
        },
        meetups::ParticipantResponse,
        pagination::PaginatedResponse,
        users::OwnerSummary,
    },
    auth::permissions::{RequiresPermission, RequiresRole, operation, resource, role},
    config::UploadsConfig,
    db::{
        handlers::{
            LocationImages, Locations, Meetups, Participants, Repository, Users,
            locations::LocationFilter,
            meetups::{MeetupFilter, StartOrder},
        },
        errors::DbError,
        models::location_images::LocationImageDBRequest,
    },
    errors::{Error, Result},
    types::{LocationId, abbrev_uuid},
};
use axum::{
    Json,
    extract::{
        Multipart, Path, Query, State,
        multipart::{Field, MultipartError},
    },
    http::StatusCode,
};
use chrono::Utc;

fn location_in_use(meetups: i64) -> Error {
    Error::Conflict {
        message: format!("Location still has {meetups} meetup(s) and cannot be deleted"),
    }
}

/// A meetup created after the count check still trips the `ON DELETE RESTRICT` key.
fn delete_error(err: DbError) -> Error {
    match err {
        DbError::ForeignKeyViolation { .. } => Error::Conflict {
            message: "Location still has meetups and cannot be deleted".to_string(),
        },
        other => other.into(),
    }
}

/// Upper bound on upcoming meetups shown on a location page
const UPCOMING_MEETUPS_LIMIT: i64 = 100;

fn location_not_found(id: LocationId) -> Error {
    Error::NotFound {
        resource: "Location".to_string(),
        id: id.to_string(),
    }
}

/// An image received through a multipart form
#[derive(Debug)]
struct ImageUpload {
    content_type: String,
    bytes: Vec<u8>,
}

/// Everything a location form may carry
#[derive(Debug, Default)]
struct LocationForm {
    fields: LocationCreate,
    image: Option<ImageUpload>,
    image_alt_text: Option<String>,
}

fn multipart_error(e: MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return Error::PayloadTooLarge { message: e.body_text() };
    }
    Error::BadRequest {
        message: format!("Failed to parse multipart data: {e}"),
    }
}

/// Stream an image field, rejecting disallowed types up front and oversized bodies as soon as the
/// running total passes the limit. An empty file input yields `None`.
async fn read_image(field: Field<'_>, uploads: &UploadsConfig) -> Result<Option<ImageUpload>> {
    let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
    let has_file_name = field.file_name().is_some_and(|name| !name.is_empty());

    let mut bytes = Vec::new();
    let mut field = field;
    let mut checked_type = false;

    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if !checked_type {
            if !uploads.allowed_image_types.iter().any(|t| t == &content_type) {
                return Err(Error::BadRequest {
                    message: format!("Image must be one of: {}", uploads.allowed_image_types.join(", ")),
                });
            }
            checked_type = true;
        }

        if (bytes.len() + chunk.len()) as u64 > uploads.max_image_size {
            tracing::warn!(
                received = bytes.len() + chunk.len(),
                max_image_size = uploads.max_image_size,
                "Image size limit exceeded, aborting upload"
            );
            return Err(Error::PayloadTooLarge {
                message: format!(
                    "Image exceeds maximum allowed size of {} bytes ({} MB)",
                    uploads.max_image_size,
                    uploads.max_image_size / (1024 * 1024)
                ),
            });
        }
        bytes.extend_from_slice(&chunk);
    }

    if bytes.is_empty() {
        if has_file_name {
            return Err(Error::BadRequest {
                message: "Image file is empty".to_string(),
            });
        }
        return Ok(None);
    }

    Ok(Some(ImageUpload { content_type, bytes }))
}

async fn read_location_form(multipart: &mut Multipart, uploads: &UploadsConfig) -> Result<LocationForm> {
    let mut form = LocationForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "image" => form.image = read_image(field, uploads).await?,
            "imageAltText" => {
                let text = field.text().await.map_err(multipart_error)?;
                let text = text.trim();
                form.image_alt_text = (!text.is_empty()).then(|| text.to_string());
            }
            _ => {
                let value = field.text().await.map_err(multipart_error)?;
                form.fields.set_field(&name, value);
            }
        }
    }

    Ok(form)
}

#[utoipa::path(
    get,
    path = "/locations",
    tag = "locations",
    summary = "List locations",
    params(ListLocationsQuery),
    responses(
        (status = 200, description = "Paginated list of locations ordered by name", body = PaginatedResponse<LocationResponse>),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_locations(
    State(state): State<AppState>,
    Query(query): Query<ListLocationsQuery>,
) -> Result<Json<PaginatedResponse<LocationResponse>>> {
    let (skip, limit) = query.pagination.params();
    let filter = LocationFilter::new(skip, limit).with_search(query.search);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Locations::new(&mut conn);
    let locations = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        locations.into_iter().map(LocationResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

#[utoipa::path(
    get,
    path = "/locations/{id}",
    tag = "locations",
    summary = "Get a location",
    params(
        ("id" = uuid::Uuid, Path, description = "Location ID"),
    ),
    responses(
        (status = 200, description = "The location with its upcoming meetups", body = LocationDetailResponse),
        (status = 404, description = "Location not found"),
    )
)]
#[tracing::instrument(skip_all, fields(location_id = %abbrev_uuid(&id)))]
pub async fn get_location(State(state): State<AppState>, Path(id): Path<LocationId>) -> Result<Json<LocationDetailResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let location = Locations::new(&mut conn).get_by_id(id).await?.ok_or_else(|| location_not_found(id))?;

    let filter = MeetupFilter {
        location_id: Some(id),
        starts_from: Some(Utc::now()),
        order: StartOrder::Ascending,
        ..MeetupFilter::new(0, UPCOMING_MEETUPS_LIMIT)
    };
    let meetups = Meetups::new(&mut conn).list(&filter).await?;

    let meetup_ids: Vec<_> = meetups.iter().map(|m| m.id).collect();
    let owner_ids: Vec<_> = meetups.iter().map(|m| m.owner_id).collect();
    let owners = Users::new(&mut conn).get_bulk(owner_ids).await?;
    let mut participants = Participants::new(&mut conn).list_for_meetups(&meetup_ids).await?;

    let mut upcoming_meetups = Vec::with_capacity(meetups.len());
    for meetup in meetups {
        // Owners are removed with their meetups, so a miss means a concurrent delete
        let Some(owner) = owners.get(&meetup.owner_id) else {
            continue;
        };
        upcoming_meetups.push(UpcomingMeetup {
            id: meetup.id,
            title: meetup.title,
            description: meetup.description,
            start_time: meetup.start_time,
            end_time: meetup.end_time,
            owner: OwnerSummary::from(owner),
            participants: participants
                .remove(&meetup.id)
                .unwrap_or_default()
                .into_iter()
                .map(ParticipantResponse::from)
                .collect(),
        });
    }

    Ok(Json(LocationDetailResponse {
        location: LocationResponse::from(location),
        upcoming_meetups,
    }))
}

#[utoipa::path(
    post,
    path = "/locations",
    tag = "locations",
    summary = "Create a location",
    request_body(content = LocationCreateForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Location created", body = LocationResponse),
        (status = 400, description = "Missing field or unsupported image type"),
        (status = 403, description = "Forbidden"),
        (status = 413, description = "Image too large"),
    ),
    security(
        ("CookieAuth" = []),
        ("ProxyHeader" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_location(
    State(state): State<AppState>,
    _: RequiresRole<role::Admin>,
    _: RequiresPermission<resource::Locations, operation::CreateAll>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<LocationResponse>)> {
    let form = read_location_form(&mut multipart, &state.config.uploads).await?;
    form.fields.validate()?;

    // Location and image land together or not at all
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut location = Locations::new(&mut tx).create(&form.fields.into_db_request()).await?;

    if let Some(image) = form.image {
        LocationImages::new(&mut tx)
            .upsert(&LocationImageDBRequest {
                location_id: location.id,
                alt_text: form.image_alt_text,
                content_type: image.content_type,
                blob: image.bytes,
            })
            .await?;
        let id = location.id;
        location = Locations::new(&mut tx).get_by_id(id).await?.ok_or_else(|| location_not_found(id))?;
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    tracing::info!(location_id = %location.id, has_image = location.image.is_some(), "Created location");
    Ok((StatusCode::CREATED, Json(LocationResponse::from(location))))
}

#[utoipa::path(
    patch,
    path = "/locations/{id}",
    tag = "locations",
    summary = "Update a location",
    request_body = LocationUpdate,
    params(
        ("id" = uuid::Uuid, Path, description = "Location ID"),
    ),
    responses(
        (status = 200, description = "Location updated", body = LocationResponse),
        (status = 400, description = "Blank field"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Location not found"),
    ),
    security(
        ("CookieAuth" = []),
        ("ProxyHeader" = [])
    )
)]
#[tracing::instrument(skip_all, fields(location_id = %abbrev_uuid(&id)))]
pub async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<LocationId>,
    _: RequiresPermission<resource::Locations, operation::UpdateAll>,
    Json(update): Json<LocationUpdate>,
) -> Result<Json<LocationResponse>> {
    update.validate()?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Locations::new(&mut conn);
    if repo.get_by_id(id).await?.is_none() {
        return Err(location_not_found(id));
    }
    let location = repo.update(id, &update.into()).await?;

    Ok(Json(LocationResponse::from(location)))
}

#[utoipa::path(
    put,
    path = "/locations/{id}/image",
    tag = "locations",
    summary = "Replace a location's image",
    request_body(content = LocationImageForm, content_type = "multipart/form-data"),
    params(
        ("id" = uuid::Uuid, Path, description = "Location ID"),
    ),
    responses(
        (status = 200, description = "Image stored", body = LocationResponse),
        (status = 400, description = "Missing image or unsupported image type"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Location not found"),
        (status = 413, description = "Image too large"),
    ),
    security(
        ("CookieAuth" = []),
        ("ProxyHeader" = [])
    )
)]
#[tracing::instrument(skip_all, fields(location_id = %abbrev_uuid(&id)))]
pub async fn replace_location_image(
    State(state): State<AppState>,
    Path(id): Path<LocationId>,
    _: RequiresPermission<resource::Locations, operation::UpdateAll>,
    mut multipart: Multipart,
) -> Result<Json<LocationResponse>> {
    {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        if Locations::new(&mut conn).get_by_id(id).await?.is_none() {
            return Err(location_not_found(id));
        }
    }

    let form = read_location_form(&mut multipart, &state.config.uploads).await?;
    let image = form.image.ok_or_else(|| Error::BadRequest {
        message: "Image is required".to_string(),
    })?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    LocationImages::new(&mut tx)
        .upsert(&LocationImageDBRequest {
            location_id: id,
            alt_text: form.image_alt_text,
            content_type: image.content_type,
            blob: image.bytes,
        })
        .await?;
    let location = Locations::new(&mut tx).get_by_id(id).await?.ok_or_else(|| location_not_found(id))?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(LocationResponse::from(location)))
}

#[utoipa::path(
    delete,
    path = "/locations/{id}",
    tag = "locations",
    summary = "Delete a location",
    params(
        ("id" = uuid::Uuid, Path, description = "Location ID"),
    ),
    responses(
        (status = 204, description = "Location deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Location not found"),
        (status = 409, description = "Location still has meetups"),
    ),
    security(
        ("CookieAuth" = []),
        ("ProxyHeader" = [])
    )
)]
#[tracing::instrument(skip_all, fields(location_id = %abbrev_uuid(&id)))]
pub async fn delete_location(
    State(state): State<AppState>,
    Path(id): Path<LocationId>,
    _: RequiresPermission<resource::Locations, operation::DeleteAll>,
) -> Result<StatusCode> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Locations::new(&mut tx);

    if repo.get_by_id(id).await?.is_none() {
        return Err(location_not_found(id));
    }
    let meetups = repo.count_meetups(id).await?;
    if meetups > 0 {
        return Err(location_in_use(meetups));
    }

    repo.delete(id).await.map_err(delete_error)?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok(StatusCode::NO_CONTENT)
}
