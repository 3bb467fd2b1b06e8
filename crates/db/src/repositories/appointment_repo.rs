//! Repository for the `appointments` table.

use optique_core::appointment::TimeRange;
use optique_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::appointment::{
    Appointment, AppointmentDetail, AppointmentFilter, ConflictCheck, CreateAppointment,
    UpdateAppointment,
};
use crate::models::status::{AppointmentStatus, StatusId};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, customer_id, title, description, start_time, end_time, status_id, \
                        notes, is_deleted, created_at, updated_at";

/// Appointment columns plus the customer and status includes.
const DETAIL_SELECT: &str = "SELECT a.id, a.customer_id, a.title, a.description, a.start_time, \
            a.end_time, a.status_id, a.notes, a.is_deleted, a.created_at, a.updated_at, \
            c.name AS customer_name, c.email AS customer_email, c.phone AS customer_phone, \
            s.name AS status_name, s.display_name AS status_display_name, s.color AS status_color \
     FROM appointments a \
     JOIN customers c ON c.id = a.customer_id \
     JOIN appointment_statuses s ON s.id = a.status_id";

/// Provides CRUD and overlap queries for appointments.
pub struct AppointmentRepo;

impl AppointmentRepo {
    /// Insert a new appointment, returning the created row.
    ///
    /// A missing `status_id` means [`AppointmentStatus::Scheduled`].
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &CreateAppointment,
    ) -> Result<Appointment, sqlx::Error> {
        let query = format!(
            "INSERT INTO appointments
                (customer_id, title, description, start_time, end_time, status_id, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(input.customer_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(
                input
                    .status_id
                    .unwrap_or_else(|| AppointmentStatus::Scheduled.id()),
            )
            .bind(&input.notes)
            .fetch_one(executor)
            .await
    }

    /// Find an appointment row by ID. Excludes soft-deleted rows.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<Appointment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM appointments WHERE id = $1 AND NOT is_deleted");
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find an appointment by ID and lock its row until the transaction ends.
    pub async fn find_by_id_for_update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<Appointment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM appointments WHERE id = $1 AND NOT is_deleted FOR UPDATE"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find an appointment with its customer and status. Excludes soft-deleted rows.
    pub async fn find_detail<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<AppointmentDetail>, sqlx::Error> {
        let query = format!("{DETAIL_SELECT} WHERE a.id = $1 AND NOT a.is_deleted");
        sqlx::query_as::<_, AppointmentDetail>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// List appointments matching `filter`, ordered by start time ascending.
    ///
    /// Soft-deleted rows are excluded unless `filter.include_deleted` is set.
    /// `from`/`to` select every appointment overlapping that window.
    pub async fn list(
        pool: &PgPool,
        filter: &AppointmentFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AppointmentDetail>, sqlx::Error> {
        let query = format!(
            "{DETAIL_SELECT}
             WHERE ($1::BOOL OR NOT a.is_deleted)
               AND ($2::TIMESTAMP IS NULL OR a.end_time > $2)
               AND ($3::TIMESTAMP IS NULL OR a.start_time < $3)
               AND ($4::SMALLINT IS NULL OR a.status_id = $4)
               AND ($5::BIGINT IS NULL OR a.customer_id = $5)
             ORDER BY a.start_time ASC, a.id ASC
             LIMIT $6 OFFSET $7"
        );
        sqlx::query_as::<_, AppointmentDetail>(&query)
            .bind(filter.include_deleted)
            .bind(filter.from)
            .bind(filter.to)
            .bind(filter.status_id)
            .bind(filter.customer_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Find the earliest non-deleted appointment overlapping `range`.
    ///
    /// Ranges are half-open, so an appointment ending exactly at
    /// `range.start()` does not collide. `exclude_id` skips one row (the
    /// appointment being updated).
    pub async fn find_conflict<'e, E: PgExecutor<'e>>(
        executor: E,
        range: &TimeRange,
        exclude_id: Option<DbId>,
    ) -> Result<Option<Appointment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM appointments
             WHERE NOT is_deleted
               AND start_time < $2
               AND end_time > $1
               AND ($3::BIGINT IS NULL OR id <> $3)
             ORDER BY start_time ASC, id ASC
             LIMIT 1"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(range.start())
            .bind(range.end())
            .bind(exclude_id)
            .fetch_optional(executor)
            .await
    }

    /// Conflict check packaged for callers that only need a yes/no plus the culprit.
    pub async fn check_conflict<'e, E: PgExecutor<'e>>(
        executor: E,
        range: &TimeRange,
        exclude_id: Option<DbId>,
    ) -> Result<ConflictCheck, sqlx::Error> {
        Ok(Self::find_conflict(executor, range, exclude_id).await?.into())
    }

    /// Update an appointment. Only non-`None` fields in `input` are applied;
    /// an empty `description` or `notes` clears that column.
    ///
    /// Returns `None` if no row with the given `id` exists (or is soft-deleted).
    pub async fn update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        input: &UpdateAppointment,
    ) -> Result<Option<Appointment>, sqlx::Error> {
        let query = format!(
            "UPDATE appointments SET
                customer_id = COALESCE($2, customer_id),
                title = COALESCE($3, title),
                description = CASE WHEN $4::TEXT IS NULL THEN description
                                   ELSE NULLIF($4, '') END,
                start_time = COALESCE($5, start_time),
                end_time = COALESCE($6, end_time),
                status_id = COALESCE($7, status_id),
                notes = CASE WHEN $8::TEXT IS NULL THEN notes ELSE NULLIF($8, '') END
             WHERE id = $1 AND NOT is_deleted
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .bind(input.customer_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.start_time)
            .bind(input.end_time)
            .bind(input.status_id)
            .bind(&input.notes)
            .fetch_optional(executor)
            .await
    }

    /// Change only the status of an appointment.
    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        status_id: StatusId,
    ) -> Result<Option<Appointment>, sqlx::Error> {
        let query = format!(
            "UPDATE appointments SET status_id = $2
             WHERE id = $1 AND NOT is_deleted
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .bind(status_id)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete an appointment by ID. Returns `true` if a row was marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE appointments SET is_deleted = TRUE WHERE id = $1 AND NOT is_deleted",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
