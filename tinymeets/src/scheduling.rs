//! Date and time-slot logic behind the meetup picker.
//!
//! A day is split into fixed-length slots (30 minutes by default) starting at midnight. Every slot
//! carries a [`BusyLevel`] hinting at how crowded a coffee shop usually is at that hour, and slots
//! that already started are flagged so clients can grey them out.
//!
//! Slots are labelled in 12-hour form with zero padding (`"09:30 AM"`, `"12:00 PM"`), which is also
//! the format [`parse_slot_label`] accepts back. Summaries use the friendlier unpadded form
//! (`"9:30 AM"`).
//!
//! All "now" and "today" computations go through [`Schedule`], which applies the configured UTC
//! offset so the booking window lines up with the venue's calendar day.

use chrono::{DateTime, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, NaiveTime, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::SchedulingConfig;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// How crowded a venue typically is during an hour of the day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum BusyLevel {
    Quiet,
    Moderate,
    Busy,
}

impl BusyLevel {
    /// Busy-level heuristic for a 24-hour clock hour.
    ///
    /// Breakfast (7-9), lunch (12-14) and after work (17-19) are busy, the shoulders around lunch
    /// are moderate, everything else is quiet.
    pub fn for_hour(hour: u32) -> Self {
        match hour {
            7..=9 | 12..=14 | 17..=19 => BusyLevel::Busy,
            10..=11 | 15..=16 => BusyLevel::Moderate,
            _ => BusyLevel::Quiet,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            BusyLevel::Quiet => "green",
            BusyLevel::Moderate => "yellow",
            BusyLevel::Busy => "red",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid time '{0}', expected hh:mm AM or hh:mm PM")]
pub struct InvalidSlotLabel(pub String);

/// One selectable start time on a given day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Slot {
    /// Zero-padded 12-hour label, e.g. `"01:30 PM"`
    pub label: String,
    #[schema(value_type = String, example = "13:30:00")]
    pub time: NaiveTime,
    pub busy_level: BusyLevel,
    #[schema(value_type = String, example = "green")]
    pub color: &'static str,
    pub is_past: bool,
}

/// Human-readable description of a chosen slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SlotSummary {
    /// e.g. `"March 7, 2025"`
    pub date: String,
    /// e.g. `"9:30 AM"`
    pub start_time: String,
    pub end_time: String,
    pub busy_level: BusyLevel,
}

/// Format a time as a zero-padded 12-hour slot label
pub fn slot_label(time: NaiveTime) -> String {
    let (is_pm, hour12) = time.hour12();
    let period = if is_pm { "PM" } else { "AM" };
    format!("{:02}:{:02} {}", hour12, time.minute(), period)
}

/// Parse a `hh:mm AM|PM` label back into a time of day.
///
/// `12 AM` is midnight and `12 PM` is noon; any other PM hour gets 12 added.
pub fn parse_slot_label(label: &str) -> Result<NaiveTime, InvalidSlotLabel> {
    let invalid = || InvalidSlotLabel(label.to_string());

    let mut parts = label.split_whitespace();
    let (clock, period) = match (parts.next(), parts.next(), parts.next()) {
        (Some(clock), Some(period), None) => (clock, period),
        _ => return Err(invalid()),
    };

    let (hours, minutes) = clock.split_once(':').ok_or_else(invalid)?;
    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&hours) || minutes > 59 {
        return Err(invalid());
    }

    let hour24 = match period {
        "AM" if hours == 12 => 0,
        "AM" => hours,
        "PM" if hours == 12 => 12,
        "PM" => hours + 12,
        _ => return Err(invalid()),
    };

    NaiveTime::from_hms_opt(hour24, minutes, 0).ok_or_else(invalid)
}

/// Every slot start of a day, from midnight, `step_minutes` apart
pub fn day_slot_times(step_minutes: u32) -> Vec<NaiveTime> {
    let step = step_minutes.max(1);
    (0..MINUTES_PER_DAY)
        .step_by(step as usize)
        .filter_map(|m| NaiveTime::from_hms_opt(m / 60, m % 60, 0))
        .collect()
}

/// True when `date` is before `today` or after `today` plus the booking window
pub fn is_date_disabled(date: NaiveDate, today: NaiveDate, window_months: u32) -> bool {
    let last_bookable = today.checked_add_months(Months::new(window_months)).unwrap_or(NaiveDate::MAX);
    date < today || date > last_bookable
}

/// The first slot boundary strictly after the current minute.
///
/// With 30-minute slots, 10:05 becomes 10:30 and 10:30 or later becomes 11:00. Past 23:xx the
/// result rolls over to midnight of the following day.
pub fn next_available_slot(now: NaiveDateTime, step_minutes: u32) -> NaiveDateTime {
    let step = step_minutes.max(1);
    let minute = now.minute();
    let next_minute = (minute / step + 1) * step;

    let hour_start = now
        .date()
        .and_hms_opt(now.hour(), 0, 0)
        .unwrap_or(now);
    hour_start + Duration::minutes(next_minute as i64)
}

pub fn is_slot_in_past(date: NaiveDate, time: NaiveTime, now: NaiveDateTime) -> bool {
    date.and_time(time) < now
}

/// Summarize a date and slot label, with the end time one slot length later
pub fn summarize(date: NaiveDate, label: &str, slot_length: Duration) -> Result<SlotSummary, InvalidSlotLabel> {
    let time = parse_slot_label(label)?;
    Ok(summarize_at(date.and_time(time), slot_length))
}

fn summarize_at(start: NaiveDateTime, slot_length: Duration) -> SlotSummary {
    let end = start + slot_length;
    SlotSummary {
        date: start.format("%B %-d, %Y").to_string(),
        start_time: start.format("%-I:%M %p").to_string(),
        end_time: end.format("%-I:%M %p").to_string(),
        busy_level: BusyLevel::for_hour(start.hour()),
    }
}

/// Single-line postal address, e.g. `"1 Main St, Springfield, IL 62701"`
pub fn combine_address(street: &str, city: &str, state: &str, zip: &str) -> String {
    format!("{street}, {city}, {state} {zip}")
}

/// Humanized distance between two instants, worded like "about 2 hours" or "3 days".
///
/// The direction does not matter, only the size of the gap.
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    const MINUTES_IN_DAY: i64 = 1440;
    const MINUTES_IN_ALMOST_TWO_DAYS: i64 = 2520;
    const MINUTES_IN_MONTH: i64 = 43200;
    const MINUTES_IN_TWO_MONTHS: i64 = 86400;

    let seconds = (now - then).num_seconds().abs();
    let minutes = (seconds as f64 / 60.0).round() as i64;

    let plural = |n: i64, unit: &str| if n == 1 { format!("1 {unit}") } else { format!("{n} {unit}s") };

    if minutes < 2 {
        return if minutes == 0 {
            "less than a minute".to_string()
        } else {
            "1 minute".to_string()
        };
    }
    if minutes < 45 {
        return plural(minutes, "minute");
    }
    if minutes < 90 {
        return "about 1 hour".to_string();
    }
    if minutes < MINUTES_IN_DAY {
        let hours = (minutes as f64 / 60.0).round() as i64;
        return format!("about {}", plural(hours, "hour"));
    }
    if minutes < MINUTES_IN_ALMOST_TWO_DAYS {
        return "1 day".to_string();
    }
    if minutes < MINUTES_IN_MONTH {
        let days = (minutes as f64 / MINUTES_IN_DAY as f64).round() as i64;
        return plural(days, "day");
    }
    if minutes < MINUTES_IN_TWO_MONTHS {
        let months = (minutes as f64 / MINUTES_IN_MONTH as f64).round() as i64;
        return format!("about {}", plural(months, "month"));
    }

    let months = minutes / MINUTES_IN_MONTH;
    if months < 12 {
        let nearest = (minutes as f64 / MINUTES_IN_MONTH as f64).round() as i64;
        return plural(nearest, "month");
    }

    let years = months / 12;
    match months % 12 {
        0..=2 => format!("about {}", plural(years, "year")),
        3..=8 => format!("over {}", plural(years, "year")),
        _ => format!("almost {}", plural(years + 1, "year")),
    }
}

/// Scheduling rules bound to the configured venue clock.
#[derive(Debug, Clone)]
pub struct Schedule {
    offset: FixedOffset,
    slot_length: Duration,
    booking_window_months: u32,
}

impl Schedule {
    pub fn new(config: &SchedulingConfig) -> Self {
        let offset = FixedOffset::east_opt(config.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix());
        let slot_length = Duration::from_std(config.slot_length).unwrap_or_else(|_| Duration::minutes(30));
        Self {
            offset,
            slot_length,
            booking_window_months: config.booking_window_months,
        }
    }

    pub fn slot_length(&self) -> Duration {
        self.slot_length
    }

    fn step_minutes(&self) -> u32 {
        self.slot_length.num_minutes().clamp(1, 60) as u32
    }

    /// Wall-clock time at the venue
    pub fn local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&self.offset).naive_local()
    }

    /// Interpret a venue wall-clock time as an instant
    pub fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        (local - Duration::seconds(self.offset.local_minus_utc() as i64)).and_utc()
    }

    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.local(now).date()
    }

    pub fn is_date_disabled(&self, date: NaiveDate, now: DateTime<Utc>) -> bool {
        is_date_disabled(date, self.today(now), self.booking_window_months)
    }

    /// All slots for `date`, flagging the ones that already started
    pub fn slots_for(&self, date: NaiveDate, now: DateTime<Utc>) -> Vec<Slot> {
        let local_now = self.local(now);
        day_slot_times(self.step_minutes())
            .into_iter()
            .map(|time| {
                let busy_level = BusyLevel::for_hour(time.hour());
                Slot {
                    label: slot_label(time),
                    time,
                    busy_level,
                    color: busy_level.color(),
                    is_past: is_slot_in_past(date, time, local_now),
                }
            })
            .collect()
    }

    /// Next slot start at the venue, as a local wall-clock time
    pub fn next_available_slot(&self, now: DateTime<Utc>) -> NaiveDateTime {
        next_available_slot(self.local(now), self.step_minutes())
    }

    pub fn summarize(&self, date: NaiveDate, label: &str) -> Result<SlotSummary, InvalidSlotLabel> {
        summarize(date, label, self.slot_length)
    }

    pub fn summarize_local(&self, start: NaiveDateTime) -> SlotSummary {
        summarize_at(start, self.slot_length)
    }

    /// Check a meetup's start and optional end against the picker rules.
    ///
    /// Returns the start and the resolved end (start plus one slot when omitted), or a message
    /// suitable for a 400 response.
    pub fn validate_meetup_window(
        &self,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), String> {
        if start < now {
            return Err("Start time cannot be in the past".to_string());
        }
        if self.is_date_disabled(self.local(start).date(), now) {
            return Err(format!(
                "Meetups can only be scheduled up to {} months in advance",
                self.booking_window_months
            ));
        }
        let end = end.unwrap_or(start + self.slot_length);
        if end <= start {
            return Err("End time must be after start time".to_string());
        }
        Ok((start, end))
    }
}
