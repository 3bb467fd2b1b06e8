//! Route definitions for the `/admin` resource.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// ```text
/// GET /roles                    -> list_roles
/// GET /roles/{id}/permissions   -> get_role_permissions
/// PUT /roles/{id}/permissions   -> replace_role_permissions
/// GET /permissions              -> list_permissions
/// GET /users                    -> list_users
/// PUT /users/{id}/role          -> assign_role
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/roles", get(admin::list_roles))
        .route(
            "/roles/{id}/permissions",
            get(admin::get_role_permissions).put(admin::replace_role_permissions),
        )
        .route("/permissions", get(admin::list_permissions))
        .route("/users", get(admin::list_users))
        .route("/users/{id}/role", put(admin::assign_role))
}
