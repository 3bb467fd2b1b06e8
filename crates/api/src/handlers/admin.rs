//! Handlers for `/admin`: roles, their permissions, and user role assignment.

use axum::extract::{Path, State};
use axum::Json;
use optique_core::error::CoreError;
use optique_core::types::DbId;
use optique_db::models::access::{Permission, Role};
use optique_db::models::user::StaffMember;
use optique_db::repositories::{AccessRepo, UserRepo};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::gate::Gated;
use crate::middleware::permission::{
    RequirePermission, RolesManage, RolesRead, UsersManage, UsersRead,
};
use crate::response::{data, DataResponse};
use crate::state::AppState;

/// Request body for `PUT /admin/roles/{id}/permissions`.
#[derive(Debug, Deserialize, Validate)]
pub struct ReplacePermissionsRequest {
    #[validate(length(max = 100))]
    pub permission_ids: Vec<DbId>,
}

/// Request body for `PUT /admin/users/{id}/role`.
#[derive(Debug, Deserialize, Validate)]
pub struct AssignRoleRequest {
    #[validate(range(min = 1))]
    pub role_id: DbId,
}

/// GET /api/v1/admin/roles
pub async fn list_roles(
    State(state): State<AppState>,
    _perm: RequirePermission<RolesRead>,
) -> AppResult<Json<DataResponse<Vec<Role>>>> {
    let roles = AccessRepo::list_roles(&state.pool).await?;
    Ok(data(roles))
}

/// GET /api/v1/admin/permissions
pub async fn list_permissions(
    State(state): State<AppState>,
    _perm: RequirePermission<RolesRead>,
) -> AppResult<Json<DataResponse<Vec<Permission>>>> {
    let permissions = AccessRepo::list_permissions(&state.pool).await?;
    Ok(data(permissions))
}

/// GET /api/v1/admin/roles/{id}/permissions
pub async fn get_role_permissions(
    State(state): State<AppState>,
    _perm: RequirePermission<RolesRead>,
    Path(role_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Permission>>>> {
    ensure_role(&state, role_id).await?;
    let permissions = AccessRepo::permissions_for_role(&state.pool, role_id).await?;
    Ok(data(permissions))
}

/// PUT /api/v1/admin/roles/{id}/permissions
///
/// Replaces the role's whole permission set in one transaction.
pub async fn replace_role_permissions(
    State(state): State<AppState>,
    Path(role_id): Path<DbId>,
    gated: Gated<RolesManage, ReplacePermissionsRequest>,
) -> AppResult<Json<DataResponse<Vec<Permission>>>> {
    ensure_role(&state, role_id).await?;
    let permissions =
        AccessRepo::set_role_permissions(&state.pool, role_id, &gated.input.permission_ids)
            .await?;
    tracing::info!(
        role_id,
        count = permissions.len(),
        user_id = gated.user.user_id,
        "Role permissions replaced",
    );
    Ok(data(permissions))
}

/// GET /api/v1/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    _perm: RequirePermission<UsersRead>,
) -> AppResult<Json<DataResponse<Vec<StaffMember>>>> {
    let users = UserRepo::list_members(&state.pool).await?;
    Ok(data(users))
}

/// PUT /api/v1/admin/users/{id}/role
pub async fn assign_role(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
    gated: Gated<UsersManage, AssignRoleRequest>,
) -> AppResult<Json<DataResponse<StaffMember>>> {
    let role_id = gated.input.role_id;
    ensure_role(&state, role_id).await?;

    if !UserRepo::set_role(&state.pool, user_id, role_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: user_id,
        }));
    }

    let user = UserRepo::find_member(&state.pool, user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: user_id,
        }))?;

    tracing::info!(
        target_user_id = user_id,
        role = %user.role,
        user_id = gated.user.user_id,
        "User role changed",
    );
    Ok(data(user))
}

async fn ensure_role(state: &AppState, role_id: DbId) -> AppResult<Role> {
    AccessRepo::find_role(&state.pool, role_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Role",
            id: role_id,
        }))
}
