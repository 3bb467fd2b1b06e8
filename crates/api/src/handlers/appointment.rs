//! Handlers for the `/appointments` resource.
//!
//! Writes go through [`Gated`] and then [`BookingRepo`], which owns the
//! opening-hours rule, the conflict check and the transaction.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use optique_core::appointment::{validate_date_field, validate_time_field, TimeRange};
use optique_core::business_hours::{parse_date, parse_time, validate_slot};
use optique_core::error::CoreError;
use optique_core::types::DbId;
use optique_db::models::appointment::{Appointment, AppointmentDetail, AppointmentFilter};
use optique_db::models::customer::{CreateCustomer, UpdateCustomer};
use optique_db::models::status::{AppointmentStatusRow, StatusId};
use optique_db::repositories::booking_repo::{
    BookingChanges, CustomerChange, CustomerRef, NewBooking,
};
use optique_db::repositories::{AppointmentRepo, AppointmentStatusRepo, BookingRepo};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::{AppError, AppResult};
use crate::middleware::gate::{Gated, NoBody};
use crate::middleware::permission::{
    AppointmentsCreate, AppointmentsDelete, AppointmentsRead, AppointmentsUpdate,
    RequirePermission,
};
use crate::query::PaginationParams;
use crate::response::{data, Created, DataResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /appointments`.
///
/// Exactly one of `customer_id` and `customer` must be present.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAppointmentRequest {
    pub customer_id: Option<DbId>,
    #[validate(nested)]
    pub customer: Option<CreateCustomer>,
    #[validate(length(min = 1, max = 200, message = "Le titre est obligatoire (200 caractères max)."))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(custom(function = "validate_date_field"))]
    pub date: String,
    #[validate(custom(function = "validate_time_field"))]
    pub start_time: String,
    #[validate(custom(function = "validate_time_field"))]
    pub end_time: String,
    pub status_id: Option<StatusId>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Request body for `PUT /appointments/{id}`. Absent fields are unchanged;
/// an empty `description` or `notes` clears it.
///
/// At most one of `customer_id` (switch), `customer` (create and attach) and
/// `customer_update` (edit the attached customer) may be present.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateAppointmentRequest {
    pub customer_id: Option<DbId>,
    #[validate(nested)]
    pub customer: Option<CreateCustomer>,
    #[validate(nested)]
    pub customer_update: Option<UpdateCustomer>,
    #[validate(length(min = 1, max = 200, message = "Le titre est obligatoire (200 caractères max)."))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(custom(function = "validate_date_field"))]
    pub date: Option<String>,
    #[validate(custom(function = "validate_time_field"))]
    pub start_time: Option<String>,
    #[validate(custom(function = "validate_time_field"))]
    pub end_time: Option<String>,
    pub status_id: Option<StatusId>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Request body for `PUT /appointments/{id}/status`.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    #[validate(range(min = 1, message = "Statut de rendez-vous invalide."))]
    pub status_id: StatusId,
}

/// Query string for `GET /appointments/availability`.
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    /// Appointment being edited, ignored when looking for collisions.
    pub exclude_id: Option<DbId>,
}

#[derive(Debug, Serialize)]
pub struct Availability {
    pub available: bool,
    pub within_business_hours: bool,
    pub conflicting: Option<Appointment>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/appointments
pub async fn list(
    State(state): State<AppState>,
    _perm: RequirePermission<AppointmentsRead>,
    Query(filter): Query<AppointmentFilter>,
    Query(page): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<AppointmentDetail>>>> {
    let (limit, offset) = page.resolve();
    let items = AppointmentRepo::list(&state.pool, &filter, limit, offset).await?;
    Ok(data(items))
}

/// GET /api/v1/appointments/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    _perm: RequirePermission<AppointmentsRead>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<AppointmentDetail>>> {
    let detail = AppointmentRepo::find_detail(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Appointment",
            id,
        }))?;
    Ok(data(detail))
}

/// GET /api/v1/appointments/availability
///
/// Read-only preview of the checks a booking would run for this slot.
pub async fn availability(
    State(state): State<AppState>,
    _perm: RequirePermission<AppointmentsRead>,
    Query(query): Query<AvailabilityQuery>,
) -> AppResult<Json<DataResponse<Availability>>> {
    let range = parse_range(&query.date, &query.start_time, &query.end_time)?;
    let within_business_hours = validate_slot(&range).is_ok();
    let check = AppointmentRepo::check_conflict(&state.pool, &range, query.exclude_id).await?;

    Ok(data(Availability {
        available: within_business_hours && !check.has_conflict,
        within_business_hours,
        conflicting: check.conflicting,
    }))
}

/// POST /api/v1/appointments
pub async fn create(
    State(state): State<AppState>,
    gated: Gated<AppointmentsCreate, CreateAppointmentRequest>,
) -> AppResult<Created<AppointmentDetail>> {
    let user_id = gated.user.user_id;
    let input = gated.input;

    let customer = match (input.customer_id, input.customer) {
        (Some(id), None) => CustomerRef::Existing(id),
        (None, Some(new)) => CustomerRef::New(new),
        _ => {
            return Err(customer_choice_error(
                "Indiquez soit un client existant, soit les informations d'un nouveau client.",
            ))
        }
    };

    let range = parse_range(&input.date, &input.start_time, &input.end_time)?;

    let detail = BookingRepo::book(
        &state.pool,
        NewBooking {
            customer,
            title: input.title,
            description: input.description,
            range,
            status_id: input.status_id,
            notes: input.notes,
        },
    )
    .await?;

    tracing::info!(
        appointment_id = detail.appointment.id,
        user_id,
        "Appointment created via API",
    );

    Ok(Created(detail))
}

/// PUT /api/v1/appointments/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    gated: Gated<AppointmentsUpdate, UpdateAppointmentRequest>,
) -> AppResult<Json<DataResponse<AppointmentDetail>>> {
    let input = gated.input;

    let customer = match (input.customer_id, input.customer, input.customer_update) {
        (None, None, None) => None,
        (Some(id), None, None) => Some(CustomerChange::Switch(id)),
        (None, Some(new), None) => Some(CustomerChange::Create(new)),
        (None, None, Some(edit)) => Some(CustomerChange::Edit(edit)),
        _ => {
            return Err(customer_choice_error(
                "Une seule modification du client est possible à la fois.",
            ))
        }
    };

    let changes = BookingChanges {
        customer,
        title: input.title,
        description: input.description,
        date: input.date.as_deref().and_then(parse_date),
        start: input.start_time.as_deref().and_then(parse_time),
        end: input.end_time.as_deref().and_then(parse_time),
        status_id: input.status_id,
        notes: input.notes,
    };

    let detail = BookingRepo::reschedule(&state.pool, id, changes).await?;

    tracing::info!(appointment_id = id, user_id = gated.user.user_id, "Appointment updated via API");

    Ok(data(detail))
}

/// PUT /api/v1/appointments/{id}/status
///
/// Status-only change. Does not touch the slot, so no conflict check.
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    gated: Gated<AppointmentsUpdate, UpdateStatusRequest>,
) -> AppResult<Json<DataResponse<AppointmentDetail>>> {
    let status_id = gated.input.status_id;

    AppointmentStatusRepo::find_by_id(&state.pool, status_id)
        .await?
        .ok_or_else(|| {
            AppError::BadRequest(format!("Statut de rendez-vous inconnu : {status_id}"))
        })?;

    AppointmentRepo::update_status(&state.pool, id, status_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Appointment",
            id,
        }))?;

    let detail = AppointmentRepo::find_detail(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Appointment",
            id,
        }))?;

    tracing::info!(
        appointment_id = id,
        status = %detail.status.name,
        user_id = gated.user.user_id,
        "Appointment status changed",
    );

    Ok(data(detail))
}

/// DELETE /api/v1/appointments/{id}
///
/// Soft delete: the row stays, flagged `is_deleted`, and frees its slot.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    gated: Gated<AppointmentsDelete, NoBody>,
) -> AppResult<StatusCode> {
    let deleted = AppointmentRepo::soft_delete(&state.pool, id).await?;
    if deleted {
        tracing::info!(appointment_id = id, user_id = gated.user.user_id, "Appointment deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "Appointment",
            id,
        }))
    }
}

/// GET /api/v1/appointment-statuses
pub async fn list_statuses(
    State(state): State<AppState>,
    _perm: RequirePermission<AppointmentsRead>,
) -> AppResult<Json<DataResponse<Vec<AppointmentStatusRow>>>> {
    let statuses = AppointmentStatusRepo::list(&state.pool).await?;
    Ok(data(statuses))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const INVALID_TIME: &str = "Heure invalide (format attendu : HH:MM).";

/// Build a time range from form strings.
///
/// Malformed values are reported as field errors; an inverted range as a
/// plain validation error.
fn parse_range(date: &str, start: &str, end: &str) -> AppResult<TimeRange> {
    let mut errors = ValidationErrors::new();
    let date = parse_date(date);
    let start = parse_time(start);
    let end = parse_time(end);

    if date.is_none() {
        errors.add(
            "date",
            field_error("invalid_date", "Date invalide (format attendu : AAAA-MM-JJ)."),
        );
    }
    if start.is_none() {
        errors.add("start_time", field_error("invalid_time", INVALID_TIME));
    }
    if end.is_none() {
        errors.add("end_time", field_error("invalid_time", INVALID_TIME));
    }

    match (date, start, end) {
        (Some(date), Some(start), Some(end)) => Ok(TimeRange::from_parts(date, start, end)?),
        _ => Err(AppError::Invalid(errors)),
    }
}

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

fn customer_choice_error(message: &'static str) -> AppError {
    let mut errors = ValidationErrors::new();
    errors.add("customer", field_error("customer_choice", message));
    AppError::Invalid(errors)
}
