pub mod admin;
pub mod appointment;
pub mod auth;
pub mod customer;
pub mod health;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                          login (public)
/// /auth/me                             current user + permissions
/// /auth/csrf                           fresh CSRF token
///
/// /appointments                        list, create
/// /appointments/availability           slot check (read-only)
/// /appointments/{id}                   get, update, soft delete
/// /appointments/{id}/status            status change
/// /appointment-statuses                status lookup table
///
/// /customers                           list/search, create
/// /customers/{id}                      get, update, soft delete
///
/// /admin/roles                         list roles
/// /admin/roles/{id}/permissions        get, replace
/// /admin/permissions                   permission catalogue
/// /admin/users                         list users with roles
/// /admin/users/{id}/role               assign role
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/appointments", appointment::router())
        .route(
            "/appointment-statuses",
            get(handlers::appointment::list_statuses),
        )
        .nest("/customers", customer::router())
        .nest("/admin", admin::router())
}
