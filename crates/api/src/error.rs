use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use optique_core::appointment::CUSTOMER_NOT_FOUND_ERROR;
use optique_core::csrf::CSRF_ERROR;
use optique_core::error::CoreError;
use optique_db::repositories::BookingError;
use serde_json::{json, Value};
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::middleware::rate_limit::RATE_LIMIT_ERROR;

/// Generic message for anything the client should not see the details of.
pub const INTERNAL_ERROR: &str = "Une erreur interne est survenue. Veuillez réessayer.";

/// Summary message accompanying `field_errors`.
pub const FIELD_ERRORS_MESSAGE: &str = "Certains champs sont invalides.";

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`BookingError`] for domain errors and adds
/// HTTP-specific variants. Implements [`IntoResponse`] to produce consistent
/// JSON error responses of the form `{ "error", "code" }`, plus
/// `field_errors` for validation failures.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `optique_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A failed booking transaction.
    #[error(transparent)]
    Booking(#[from] BookingError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Field-level validation failures.
    #[error("Validation failed: {0}")]
    Invalid(#[from] ValidationErrors),

    /// The caller's rate-limit bucket is empty.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Missing, forged or expired CSRF token.
    #[error("CSRF validation failed")]
    Csrf,

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a message for the logs only.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

struct ErrorBody {
    status: StatusCode,
    code: &'static str,
    message: String,
    extra: Option<(&'static str, Value)>,
}

impl ErrorBody {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            extra: None,
        }
    }

    fn with(mut self, key: &'static str, value: Value) -> Self {
        self.extra = Some((key, value));
        self
    }

    fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", INTERNAL_ERROR)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Booking(err) => classify_booking_error(err),
            AppError::Database(err) => classify_sqlx_error(err),
            AppError::Invalid(errors) => ErrorBody::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
                FIELD_ERRORS_MESSAGE,
            )
            .with("field_errors", json!(flatten_field_errors(errors))),
            AppError::RateLimited => {
                ErrorBody::new(StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED", RATE_LIMIT_ERROR)
            }
            AppError::Csrf => ErrorBody::new(StatusCode::FORBIDDEN, "CSRF_ERROR", CSRF_ERROR),
            AppError::BadRequest(msg) => {
                ErrorBody::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone())
            }
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ErrorBody::internal()
            }
        };

        let mut json = json!({
            "error": body.message,
            "code": body.code,
        });
        if let (Some((key, value)), Some(obj)) = (body.extra, json.as_object_mut()) {
            obj.insert(key.to_string(), value);
        }

        (body.status, axum::Json(json)).into_response()
    }
}

fn classify_core_error(core: &CoreError) -> ErrorBody {
    match core {
        CoreError::NotFound { entity, id } => ErrorBody::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{} introuvable (id {id}).", entity_label(entity)),
        ),
        CoreError::Validation(msg) => {
            ErrorBody::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
        }
        CoreError::Conflict(msg) => ErrorBody::new(StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Unauthorized(msg) => {
            ErrorBody::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
        }
        CoreError::Forbidden(msg) => ErrorBody::new(StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            ErrorBody::internal()
        }
    }
}

fn classify_booking_error(err: &BookingError) -> ErrorBody {
    match err {
        BookingError::CustomerNotFound(id) => ErrorBody::new(
            StatusCode::NOT_FOUND,
            "CUSTOMER_NOT_FOUND",
            CUSTOMER_NOT_FOUND_ERROR,
        )
        .with("customer_id", json!(id)),
        BookingError::AppointmentNotFound(id) => ErrorBody::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("Rendez-vous introuvable (id {id})."),
        ),
        BookingError::StatusNotFound(id) => ErrorBody::new(
            StatusCode::BAD_REQUEST,
            "BAD_REQUEST",
            format!("Statut de rendez-vous inconnu : {id}"),
        ),
        BookingError::TimeConflict(existing) => {
            ErrorBody::new(StatusCode::CONFLICT, "TIME_CONFLICT", err.to_string())
                .with("conflicting_appointment_id", json!(existing.id))
        }
        BookingError::Rule(core) => classify_core_error(core),
        BookingError::Database(db) => classify_sqlx_error(db),
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Foreign key violations map to 400.
/// - Everything else maps to 500 with a sanitized message.
///
/// Constraint names go to the log, never to the client.
fn classify_sqlx_error(err: &sqlx::Error) -> ErrorBody {
    match err {
        sqlx::Error::RowNotFound => {
            ErrorBody::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Ressource introuvable.")
        }
        sqlx::Error::Database(db_err) => {
            let constraint = db_err.constraint().unwrap_or("unknown");
            match db_err.code().as_deref() {
                Some("23505") if constraint.starts_with("uq_") => {
                    tracing::warn!(constraint, "Unique constraint violated");
                    ErrorBody::new(
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        "Cette valeur est déjà utilisée.",
                    )
                }
                Some("23503") => {
                    tracing::warn!(constraint, "Foreign key violated");
                    ErrorBody::new(
                        StatusCode::BAD_REQUEST,
                        "BAD_REQUEST",
                        "Une référence fournie n'existe pas.",
                    )
                }
                _ => {
                    tracing::error!(error = %db_err, "Database error");
                    ErrorBody::internal()
                }
            }
        }
        other => {
            tracing::error!(error = %other, "Database error");
            ErrorBody::internal()
        }
    }
}

/// French display name for the entities handlers report as missing.
fn entity_label(entity: &str) -> &str {
    match entity {
        "Appointment" => "Rendez-vous",
        "Customer" => "Client",
        "Role" => "Rôle",
        "User" => "Utilisateur",
        other => other,
    }
}

/// Flatten nested validator output into `{ "field.path": [messages] }`.
///
/// Nested structs are joined with `.` and list items with `[i]`, so an
/// inline customer's name error reports as `customer.name`.
pub fn flatten_field_errors(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    let mut out = BTreeMap::new();
    collect_field_errors(errors, "", &mut out);
    out
}

fn collect_field_errors(
    errors: &ValidationErrors,
    prefix: &str,
    out: &mut BTreeMap<String, Vec<String>>,
) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                let messages = out.entry(path).or_default();
                for err in list {
                    messages.push(
                        err.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("Valeur invalide ({}).", err.code)),
                    );
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_field_errors(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_field_errors(inner, &format!("{path}[{index}]"), out);
                }
            }
        }
    }
}
