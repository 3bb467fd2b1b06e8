//! Store opening hours: Monday to Saturday, 09:00 to 19:00.
//!
//! Appointment times are store wall-clock values, so the rule is applied to
//! naive dates and times. Minutes since midnight are compared against a
//! half-open window: 09:00 is bookable, 19:00 is not.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Weekday};

use crate::appointment::TimeRange;
use crate::error::CoreError;

/// First bookable minute of the day (09:00).
pub const OPENING_MINUTE: u32 = 9 * 60;

/// Closing minute (19:00). A start at this minute is rejected; an end at it is fine.
pub const CLOSING_MINUTE: u32 = 19 * 60;

/// Message shown to the user when a slot falls outside opening hours.
pub const BUSINESS_HOURS_ERROR: &str =
    "Les rendez-vous sont possibles uniquement du lundi au samedi, de 9h00 à 19h00.";

/// Check a form-style date and time against opening hours.
///
/// `date` is `YYYY-MM-DD` (a full ISO datetime is accepted, only its date
/// part is used) and `time` is `HH:MM` or `HH:MM:SS`. Anything that does not
/// parse is treated as outside business hours.
pub fn validate_business_hours(date: &str, time: &str) -> bool {
    match (parse_date(date), parse_time(time)) {
        (Some(date), Some(time)) => is_open_at(date, time),
        _ => false,
    }
}

/// Typed form of [`validate_business_hours`].
pub fn is_open_at(date: NaiveDate, time: NaiveTime) -> bool {
    if date.weekday() == Weekday::Sun {
        return false;
    }
    (OPENING_MINUTE..CLOSING_MINUTE).contains(&minutes_since_midnight(time))
}

/// Validate a whole appointment slot.
///
/// The start must be bookable, the slot must not cross midnight, and it must
/// end no later than closing time.
pub fn validate_slot(range: &TimeRange) -> Result<(), CoreError> {
    let start = range.start();
    let end = range.end();

    let within = is_open_at(start.date(), start.time())
        && end.date() == start.date()
        && minutes_since_midnight(end.time()) <= CLOSING_MINUTE;

    if within {
        Ok(())
    } else {
        Err(CoreError::Validation(BUSINESS_HOURS_ERROR.to_string()))
    }
}

/// Parse an ISO date, tolerating a trailing `T...` time component.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let date_part = value.split('T').next().unwrap_or(value);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Parse `HH:MM` or `HH:MM:SS`.
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

fn minutes_since_midnight(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}
