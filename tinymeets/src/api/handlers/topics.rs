use crate::{
    AppState,
    api::models::topics::TopicResponse,
    db::handlers::Topics,
    errors::{Error, Result},
};
use axum::{Json, extract::State};

#[utoipa::path(
    get,
    path = "/topics",
    tag = "meetups",
    summary = "List topics",
    responses(
        (status = 200, description = "All topics ordered by name", body = Vec<TopicResponse>),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_topics(State(state): State<AppState>) -> Result<Json<Vec<TopicResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let topics = Topics::new(&mut conn).list().await?;
    Ok(Json(topics.into_iter().map(TopicResponse::from).collect()))
}
