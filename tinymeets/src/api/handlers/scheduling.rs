use crate::{
    AppState,
    api::models::scheduling::{NextSlotResponse, SlotsQuery, SlotsResponse, SummaryQuery},
    errors::{Error, Result},
    scheduling::{Schedule, SlotSummary, slot_label},
};
use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;

#[utoipa::path(
    get,
    path = "/schedule/slots",
    tag = "schedule",
    summary = "List time slots for a day",
    params(SlotsQuery),
    responses(
        (status = 200, description = "Every slot of the day with its busy level", body = SlotsResponse),
        (status = 400, description = "Date outside the booking window"),
    )
)]
#[tracing::instrument(skip_all, fields(date = %query.date))]
pub async fn list_slots(State(state): State<AppState>, Query(query): Query<SlotsQuery>) -> Result<Json<SlotsResponse>> {
    let schedule = Schedule::new(&state.config.scheduling);
    let now = Utc::now();

    if schedule.is_date_disabled(query.date, now) {
        return Err(Error::BadRequest {
            message: format!("{} is outside the booking window", query.date.format("%Y-%m-%d")),
        });
    }

    Ok(Json(SlotsResponse {
        date: query.date,
        slots: schedule.slots_for(query.date, now),
    }))
}

#[utoipa::path(
    get,
    path = "/schedule/next-slot",
    tag = "schedule",
    summary = "Next available slot",
    responses(
        (status = 200, description = "The earliest slot that can still be booked", body = NextSlotResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn next_slot(State(state): State<AppState>) -> Json<NextSlotResponse> {
    let schedule = Schedule::new(&state.config.scheduling);
    let next = schedule.next_available_slot(Utc::now());

    Json(NextSlotResponse {
        date: next.date(),
        time: slot_label(next.time()),
        starts_at: schedule.to_utc(next),
        summary: schedule.summarize_local(next),
    })
}

#[utoipa::path(
    get,
    path = "/schedule/summary",
    tag = "schedule",
    summary = "Describe a chosen slot",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Human-readable slot summary", body = SlotSummary),
        (status = 400, description = "Unparseable time"),
    )
)]
#[tracing::instrument(skip_all, fields(date = %query.date, time = %query.time))]
pub async fn summarize_slot(State(state): State<AppState>, Query(query): Query<SummaryQuery>) -> Result<Json<SlotSummary>> {
    let schedule = Schedule::new(&state.config.scheduling);
    let summary = schedule
        .summarize(query.date, &query.time)
        .map_err(|e| Error::BadRequest { message: e.to_string() })?;
    Ok(Json(summary))
}
