//! Binary resources: stored location images and embedded static files.

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::instrument;

use crate::{
    AppState,
    db::handlers::LocationImages,
    errors::{Error, Result},
    static_assets::{self, PLACEHOLDER_IMAGE},
    types::{LocationId, abbrev_uuid},
};

const ONE_YEAR_CACHE: &str = "public, max-age=31536000";

/// Serve the stored image bytes of a location
#[utoipa::path(
    get,
    path = "/resources/location-images/{location_id}",
    tag = "resources",
    params(
        ("location_id" = uuid::Uuid, Path, description = "Location ID"),
    ),
    responses(
        (status = 200, description = "Raw image bytes", content_type = "image/*"),
        (status = 404, description = "Image not found"),
    )
)]
#[instrument(skip_all, fields(location_id = %abbrev_uuid(&location_id)))]
pub async fn get_location_image(State(state): State<AppState>, Path(location_id): Path<LocationId>) -> Result<Response> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let image = LocationImages::new(&mut conn)
        .get_by_location(location_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Image".to_string(),
            id: location_id.to_string(),
        })?;

    Ok((
        [
            (header::CONTENT_TYPE, image.content_type),
            (header::CONTENT_LENGTH, image.blob.len().to_string()),
            (header::CONTENT_DISPOSITION, format!("inline; filename=\"{location_id}\"")),
            (header::CACHE_CONTROL, ONE_YEAR_CACHE.to_string()),
        ],
        image.blob,
    )
        .into_response())
}

/// Serve the embedded "No Image Available" placeholder
#[utoipa::path(
    get,
    path = "/resources/placeholder.svg",
    tag = "resources",
    responses(
        (status = 200, description = "Placeholder image", content_type = "image/svg+xml"),
    )
)]
#[instrument]
pub async fn get_placeholder_image() -> Response {
    let Some(content) = static_assets::Assets::get(PLACEHOLDER_IMAGE) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let mime = mime_guess::from_path(PLACEHOLDER_IMAGE).first_or_octet_stream();

    (
        [
            (header::CONTENT_TYPE, mime.as_ref().to_string()),
            (header::CACHE_CONTROL, format!("{ONE_YEAR_CACHE}, immutable")),
        ],
        content.data.into_owned(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use crate::db::{
        handlers::LocationImages,
        models::location_images::LocationImageDBRequest,
    };
    use crate::test_utils::{create_test_app, create_test_location};
    use axum::http::StatusCode;
    use sqlx::SqlitePool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_location_image_headers(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        let location = create_test_location(&pool, "Cafe Luna").await;
        {
            let mut conn = pool.acquire().await.unwrap();
            LocationImages::new(&mut conn)
                .upsert(&LocationImageDBRequest {
                    location_id: location.id,
                    alt_text: None,
                    content_type: "image/gif".to_string(),
                    blob: b"GIF89a".to_vec(),
                })
                .await
                .unwrap();
        }

        let response = server.get(&format!("/resources/location-images/{}", location.id)).await;
        response.assert_status_ok();
        assert_eq!(response.header("content-type"), "image/gif");
        assert_eq!(response.header("content-length"), "6");
        assert_eq!(
            response.header("content-disposition").to_str().unwrap(),
            format!("inline; filename=\"{}\"", location.id)
        );
        assert_eq!(response.header("cache-control"), "public, max-age=31536000");
        assert_eq!(response.as_bytes().as_ref(), b"GIF89a");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_missing_location_image(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        let location = create_test_location(&pool, "Cafe Luna").await;

        let response = server.get(&format!("/resources/location-images/{}", location.id)).await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.text(), "Image not found");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_placeholder(pool: SqlitePool) {
        let server = create_test_app(pool).await;

        let response = server.get("/resources/placeholder.svg").await;
        response.assert_status_ok();
        assert_eq!(response.header("content-type"), "image/svg+xml");
        assert_eq!(response.header("cache-control"), "public, max-age=31536000, immutable");
        assert!(response.text().contains("<svg"));
    }
}
