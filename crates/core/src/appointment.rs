//! Appointment time ranges and form-field rules.

use std::borrow::Cow;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use validator::ValidationError;

use crate::business_hours::{parse_date, parse_time};
use crate::error::CoreError;
use crate::types::LocalDateTime;

/// Maximum length of an appointment title.
pub const MAX_TITLE_LEN: u64 = 200;

/// Maximum length of free-text notes and descriptions.
pub const MAX_NOTES_LEN: u64 = 2_000;

pub const INVALID_RANGE_ERROR: &str = "L'heure de fin doit être postérieure à l'heure de début.";

pub const TIME_CONFLICT_ERROR: &str =
    "Ce créneau chevauche un rendez-vous existant. Veuillez choisir un autre horaire.";

pub const CUSTOMER_NOT_FOUND_ERROR: &str = "Client introuvable.";

/// A half-open `[start, end)` interval with `end > start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    start: LocalDateTime,
    end: LocalDateTime,
}

impl TimeRange {
    pub fn new(start: LocalDateTime, end: LocalDateTime) -> Result<Self, CoreError> {
        if end <= start {
            return Err(CoreError::Validation(INVALID_RANGE_ERROR.to_string()));
        }
        Ok(Self { start, end })
    }

    /// Build a range from a calendar date and two wall-clock times on it.
    pub fn from_parts(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Result<Self, CoreError> {
        Self::new(date.and_time(start), date.and_time(end))
    }

    pub fn start(&self) -> LocalDateTime {
        self.start
    }

    pub fn end(&self) -> LocalDateTime {
        self.end
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// True when the two intervals share any instant. Touching ends do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// Combine a stored range with optional replacement date/start/end values.
///
/// Used by updates: any part not supplied keeps its stored value. The stored
/// duration is not preserved; if only the start moves, the stored end time of
/// day is kept.
pub fn merge_range(
    current: &TimeRange,
    date: Option<NaiveDate>,
    start: Option<NaiveTime>,
    end: Option<NaiveTime>,
) -> Result<TimeRange, CoreError> {
    let date = date.unwrap_or_else(|| current.start().date());
    let start = start.unwrap_or_else(|| current.start().time());
    let end = end.unwrap_or_else(|| current.end().time());
    TimeRange::from_parts(date, start, end)
}

// ---------------------------------------------------------------------------
// Field validators (used by `#[validate(custom(...))]` on request DTOs)
// ---------------------------------------------------------------------------

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// `YYYY-MM-DD`.
pub fn validate_date_field(value: &str) -> Result<(), ValidationError> {
    parse_date(value)
        .map(|_| ())
        .ok_or_else(|| field_error("invalid_date", "Date invalide (format attendu : AAAA-MM-JJ)."))
}

/// `HH:MM` or `HH:MM:SS`.
pub fn validate_time_field(value: &str) -> Result<(), ValidationError> {
    parse_time(value)
        .map(|_| ())
        .ok_or_else(|| field_error("invalid_time", "Heure invalide (format attendu : HH:MM)."))
}

/// Between 6 and 20 digits, optionally with spaces, dots, dashes, parentheses
/// and a leading `+`.
pub fn validate_phone_field(value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let allowed = body
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '.' | '-' | '(' | ')'));
    let digits = body.chars().filter(char::is_ascii_digit).count();

    if allowed && (6..=20).contains(&digits) {
        Ok(())
    } else {
        Err(field_error("invalid_phone", "Numéro de téléphone invalide."))
    }
}
