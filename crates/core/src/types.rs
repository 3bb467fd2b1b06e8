/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Record timestamps (`created_at`, `updated_at`) are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Appointment bounds are store wall-clock times with no zone attached.
pub type LocalDateTime = chrono::NaiveDateTime;
