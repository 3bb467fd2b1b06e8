//! Appointment booking: customer resolution, conflict check and write in one
//! transaction.
//!
//! Every booking write takes a transaction-scoped advisory lock first, so two
//! concurrent requests can never both pass the conflict check for the same
//! slot. The lock is released automatically on commit or rollback.

use chrono::{NaiveDate, NaiveTime};
use optique_core::appointment::{merge_range, TimeRange, CUSTOMER_NOT_FOUND_ERROR, TIME_CONFLICT_ERROR};
use optique_core::business_hours::validate_slot;
use optique_core::error::CoreError;
use optique_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::appointment::{
    Appointment, AppointmentDetail, CreateAppointment, UpdateAppointment,
};
use crate::models::customer::{CreateCustomer, UpdateCustomer};
use crate::models::status::StatusId;
use crate::repositories::{AppointmentRepo, AppointmentStatusRepo, CustomerRepo};

/// Advisory lock ID serialising appointment writes.
pub const APPOINTMENT_BOOKING_LOCK_ID: i64 = 604_118_207;

/// Failures of a booking transaction.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("{}", CUSTOMER_NOT_FOUND_ERROR)]
    CustomerNotFound(DbId),

    #[error("Appointment not found: {0}")]
    AppointmentNotFound(DbId),

    #[error("Unknown appointment status: {0}")]
    StatusNotFound(StatusId),

    /// The requested slot overlaps this existing appointment.
    #[error("{}", TIME_CONFLICT_ERROR)]
    TimeConflict(Box<Appointment>),

    /// Range or business-hours rule violation.
    #[error(transparent)]
    Rule(#[from] CoreError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Which customer a new appointment is for.
#[derive(Debug, Clone)]
pub enum CustomerRef {
    Existing(DbId),
    New(CreateCustomer),
}

/// Customer-side change applied while updating an appointment.
#[derive(Debug, Clone)]
pub enum CustomerChange {
    /// Attach the appointment to another existing customer.
    Switch(DbId),
    /// Create a customer and attach the appointment to it.
    Create(CreateCustomer),
    /// Edit the currently attached customer in place.
    Edit(UpdateCustomer),
}

/// A validated request to book a new appointment.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub customer: CustomerRef,
    pub title: String,
    pub description: Option<String>,
    pub range: TimeRange,
    pub status_id: Option<StatusId>,
    pub notes: Option<String>,
}

/// Changes to an existing appointment. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct BookingChanges {
    pub customer: Option<CustomerChange>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
    pub status_id: Option<StatusId>,
    pub notes: Option<String>,
}

impl BookingChanges {
    /// True when the appointment's time slot would move.
    pub fn moves_slot(&self) -> bool {
        self.date.is_some() || self.start.is_some() || self.end.is_some()
    }
}

/// Transactional booking writes.
pub struct BookingRepo;

impl BookingRepo {
    /// Book a new appointment.
    ///
    /// Order: opening hours, status, customer, conflict, insert. Any error
    /// drops the transaction, so an inline customer is never left behind
    /// without its appointment.
    pub async fn book(pool: &PgPool, input: NewBooking) -> Result<AppointmentDetail, BookingError> {
        validate_slot(&input.range)?;

        let mut tx = pool.begin().await?;
        lock_bookings(&mut tx).await?;

        if let Some(status_id) = input.status_id {
            ensure_status(&mut tx, status_id).await?;
        }

        let customer_id = match &input.customer {
            CustomerRef::Existing(id) => CustomerRepo::find_by_id(&mut *tx, *id)
                .await?
                .map(|c| c.id)
                .ok_or(BookingError::CustomerNotFound(*id))?,
            CustomerRef::New(new) => CustomerRepo::create(&mut *tx, new).await?.id,
        };

        if let Some(existing) = AppointmentRepo::find_conflict(&mut *tx, &input.range, None).await? {
            return Err(BookingError::TimeConflict(Box::new(existing)));
        }

        let created = AppointmentRepo::create(
            &mut *tx,
            &CreateAppointment {
                customer_id,
                title: input.title,
                description: input.description,
                start_time: input.range.start(),
                end_time: input.range.end(),
                status_id: input.status_id,
                notes: input.notes,
            },
        )
        .await?;

        let detail = AppointmentRepo::find_detail(&mut *tx, created.id)
            .await?
            .ok_or(BookingError::AppointmentNotFound(created.id))?;

        tx.commit().await?;

        tracing::info!(
            appointment_id = detail.appointment.id,
            customer_id,
            start = %detail.appointment.start_time,
            end = %detail.appointment.end_time,
            "Appointment booked",
        );

        Ok(detail)
    }

    /// Apply `changes` to appointment `id`.
    ///
    /// The resulting slot is rebuilt from the stored range plus the supplied
    /// parts, then re-validated and re-checked for conflicts excluding the
    /// appointment itself.
    pub async fn reschedule(
        pool: &PgPool,
        id: DbId,
        changes: BookingChanges,
    ) -> Result<AppointmentDetail, BookingError> {
        let mut tx = pool.begin().await?;
        lock_bookings(&mut tx).await?;

        let current = AppointmentRepo::find_by_id_for_update(&mut *tx, id)
            .await?
            .ok_or(BookingError::AppointmentNotFound(id))?;

        let range = if changes.moves_slot() {
            let stored = TimeRange::new(current.start_time, current.end_time)?;
            let merged = merge_range(&stored, changes.date, changes.start, changes.end)?;
            validate_slot(&merged)?;
            if let Some(existing) =
                AppointmentRepo::find_conflict(&mut *tx, &merged, Some(id)).await?
            {
                return Err(BookingError::TimeConflict(Box::new(existing)));
            }
            Some(merged)
        } else {
            None
        };

        if let Some(status_id) = changes.status_id {
            ensure_status(&mut tx, status_id).await?;
        }

        let customer_id = match &changes.customer {
            None => None,
            Some(CustomerChange::Switch(customer_id)) => Some(
                CustomerRepo::find_by_id(&mut *tx, *customer_id)
                    .await?
                    .map(|c| c.id)
                    .ok_or(BookingError::CustomerNotFound(*customer_id))?,
            ),
            Some(CustomerChange::Create(new)) => Some(CustomerRepo::create(&mut *tx, new).await?.id),
            Some(CustomerChange::Edit(edit)) => {
                if !edit.is_empty() {
                    CustomerRepo::update(&mut *tx, current.customer_id, edit)
                        .await?
                        .ok_or(BookingError::CustomerNotFound(current.customer_id))?;
                }
                None
            }
        };

        let update = UpdateAppointment {
            customer_id,
            title: changes.title,
            description: changes.description,
            start_time: range.map(|r| r.start()),
            end_time: range.map(|r| r.end()),
            status_id: changes.status_id,
            notes: changes.notes,
        };
        AppointmentRepo::update(&mut *tx, id, &update)
            .await?
            .ok_or(BookingError::AppointmentNotFound(id))?;

        let detail = AppointmentRepo::find_detail(&mut *tx, id)
            .await?
            .ok_or(BookingError::AppointmentNotFound(id))?;

        tx.commit().await?;

        tracing::info!(
            appointment_id = id,
            customer_id = detail.appointment.customer_id,
            moved = range.is_some(),
            "Appointment updated",
        );

        Ok(detail)
    }
}

/// Take the booking advisory lock for the rest of the transaction.
async fn lock_bookings(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(APPOINTMENT_BOOKING_LOCK_ID)
        .execute(conn)
        .await?;
    Ok(())
}

async fn ensure_status(conn: &mut PgConnection, status_id: StatusId) -> Result<(), BookingError> {
    AppointmentStatusRepo::find_by_id(conn, status_id)
        .await?
        .map(|_| ())
        .ok_or(BookingError::StatusNotFound(status_id))
}
