//! API request/response models for the slot picker.

use crate::scheduling::{Slot, SlotSummary};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
pub struct SlotsQuery {
    /// Calendar day at the venue, `YYYY-MM-DD`
    #[param(value_type = String, format = Date)]
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SummaryQuery {
    #[param(value_type = String, format = Date)]
    pub date: NaiveDate,
    /// Slot label, e.g. `09:30 AM`
    pub time: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SlotsResponse {
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    pub slots: Vec<Slot>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NextSlotResponse {
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    /// Slot label, e.g. `09:30 AM`
    pub time: String,
    /// The same slot start as an instant, ready for `starts_at` on a new meetup
    pub starts_at: DateTime<Utc>,
    pub summary: SlotSummary,
}
