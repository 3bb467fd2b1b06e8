//! Permission-based access control.
//!
//! Each route names the permission it needs as a marker type, so the check
//! is part of the handler signature:
//!
//! ```ignore
//! async fn list(RequirePermission(user, ..): RequirePermission<AppointmentsRead>) { .. }
//! ```
//!
//! The grant is looked up in `role_permissions` through the user's current
//! role on every request.

use std::marker::PhantomData;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use optique_core::error::CoreError;
use optique_core::roles::Permission;
use optique_db::repositories::AccessRepo;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Message returned when the caller's role lacks the permission.
pub const FORBIDDEN_ERROR: &str = "Vous n'avez pas les droits nécessaires pour cette action.";

/// A type-level name for one permission.
pub trait RequiredPermission: Send + Sync + 'static {
    const PERMISSION: Permission;
}

macro_rules! permission_markers {
    ( $( $name:ident => $perm:ident ),+ $(,)? ) => {
        $(
            #[derive(Debug)]
            pub struct $name;

            impl RequiredPermission for $name {
                const PERMISSION: Permission = Permission::$perm;
            }
        )+
    };
}

permission_markers! {
    AppointmentsRead => APPOINTMENTS_READ,
    AppointmentsCreate => APPOINTMENTS_CREATE,
    AppointmentsUpdate => APPOINTMENTS_UPDATE,
    AppointmentsDelete => APPOINTMENTS_DELETE,
    CustomersRead => CUSTOMERS_READ,
    CustomersCreate => CUSTOMERS_CREATE,
    CustomersUpdate => CUSTOMERS_UPDATE,
    CustomersDelete => CUSTOMERS_DELETE,
    UsersRead => USERS_READ,
    UsersManage => USERS_MANAGE,
    RolesRead => ROLES_READ,
    RolesManage => ROLES_MANAGE,
}

/// Check that `user` currently holds `permission`.
pub async fn require_permission(
    state: &AppState,
    user: &AuthUser,
    permission: Permission,
) -> Result<(), AppError> {
    let granted =
        AccessRepo::user_can(&state.pool, user.user_id, permission.resource, permission.action)
            .await?;

    if granted {
        Ok(())
    } else {
        tracing::warn!(user_id = user.user_id, %permission, "Permission denied");
        Err(AppError::Core(CoreError::Forbidden(FORBIDDEN_ERROR.into())))
    }
}

/// Requires permission `P`. Rejects with 401 without a valid token and 403
/// without the grant.
pub struct RequirePermission<P>(pub AuthUser, PhantomData<fn() -> P>);

impl<P: RequiredPermission> RequirePermission<P> {
    pub fn user(&self) -> &AuthUser {
        &self.0
    }
}

impl<P: RequiredPermission> FromRequestParts<AppState> for RequirePermission<P> {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        require_permission(state, &user, P::PERMISSION).await?;
        Ok(RequirePermission(user, PhantomData))
    }
}
