//! Appointment entity model, relation-joined view, and DTOs.

use optique_core::types::{DbId, LocalDateTime, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::status::StatusId;

/// An appointment row from the `appointments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Appointment {
    pub id: DbId,
    pub customer_id: DbId,
    pub title: String,
    pub description: Option<String>,
    /// Store wall-clock time, no zone.
    pub start_time: LocalDateTime,
    pub end_time: LocalDateTime,
    pub status_id: StatusId,
    pub notes: Option<String>,
    pub is_deleted: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Customer fields joined onto an appointment.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CustomerSummary {
    #[sqlx(rename = "customer_id")]
    pub id: DbId,
    #[sqlx(rename = "customer_name")]
    pub name: String,
    #[sqlx(rename = "customer_email")]
    pub email: Option<String>,
    #[sqlx(rename = "customer_phone")]
    pub phone: Option<String>,
}

/// Status fields joined onto an appointment.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StatusSummary {
    #[sqlx(rename = "status_id")]
    pub id: StatusId,
    #[sqlx(rename = "status_name")]
    pub name: String,
    #[sqlx(rename = "status_display_name")]
    pub display_name: String,
    #[sqlx(rename = "status_color")]
    pub color: String,
}

/// An appointment with its customer and status included.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AppointmentDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub appointment: Appointment,
    #[sqlx(flatten)]
    pub customer: CustomerSummary,
    #[sqlx(flatten)]
    pub status: StatusSummary,
}

/// Row-level insert DTO. The customer is already resolved to an id.
#[derive(Debug, Clone)]
pub struct CreateAppointment {
    pub customer_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub start_time: LocalDateTime,
    pub end_time: LocalDateTime,
    /// Defaults to 1 (Scheduled) if omitted.
    pub status_id: Option<StatusId>,
    pub notes: Option<String>,
}

/// Row-level update DTO. Only non-`None` fields are applied; `Some("")`
/// clears `description` or `notes`.
#[derive(Debug, Clone, Default)]
pub struct UpdateAppointment {
    pub customer_id: Option<DbId>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<LocalDateTime>,
    pub end_time: Option<LocalDateTime>,
    pub status_id: Option<StatusId>,
    pub notes: Option<String>,
}

/// Filters for listing appointments. Every filter is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentFilter {
    /// Only appointments ending after this instant.
    pub from: Option<LocalDateTime>,
    /// Only appointments starting before this instant.
    pub to: Option<LocalDateTime>,
    pub status_id: Option<StatusId>,
    pub customer_id: Option<DbId>,
    #[serde(default)]
    pub include_deleted: bool,
}

/// Outcome of a conflict check against existing appointments.
#[derive(Debug, Clone, Serialize)]
pub struct ConflictCheck {
    pub has_conflict: bool,
    /// The earliest colliding appointment, if any.
    pub conflicting: Option<Appointment>,
}

impl From<Option<Appointment>> for ConflictCheck {
    fn from(conflicting: Option<Appointment>) -> Self {
        Self {
            has_conflict: conflicting.is_some(),
            conflicting,
        }
    }
}
