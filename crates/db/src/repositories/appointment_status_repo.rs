//! Repository for the `appointment_statuses` lookup table.

use sqlx::{PgExecutor, PgPool};

use crate::models::status::{AppointmentStatusRow, StatusId};

const COLUMNS: &str = "id, name, display_name, color";

/// Read-only access to appointment statuses.
pub struct AppointmentStatusRepo;

impl AppointmentStatusRepo {
    /// List all statuses in seed order.
    pub async fn list(pool: &PgPool) -> Result<Vec<AppointmentStatusRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM appointment_statuses ORDER BY id ASC");
        sqlx::query_as::<_, AppointmentStatusRow>(&query)
            .fetch_all(pool)
            .await
    }

    /// Find a status by ID.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: StatusId,
    ) -> Result<Option<AppointmentStatusRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM appointment_statuses WHERE id = $1");
        sqlx::query_as::<_, AppointmentStatusRow>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }
}
