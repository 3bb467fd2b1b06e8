//! Route definitions for the `/appointments` resource.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::appointment;
use crate::state::AppState;

/// Routes mounted at `/appointments`.
///
/// ```text
/// GET    /               -> list
/// POST   /               -> create
/// GET    /availability   -> availability
/// GET    /{id}           -> get_by_id
/// PUT    /{id}           -> update
/// DELETE /{id}           -> delete
/// PUT    /{id}/status    -> update_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(appointment::list).post(appointment::create))
        .route("/availability", get(appointment::availability))
        .route(
            "/{id}",
            get(appointment::get_by_id)
                .put(appointment::update)
                .delete(appointment::delete),
        )
        .route("/{id}/status", put(appointment::update_status))
}
