//! Handlers for the `/customers` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use optique_core::error::CoreError;
use optique_core::types::DbId;
use optique_db::models::customer::{CreateCustomer, Customer, UpdateCustomer};
use optique_db::repositories::CustomerRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::gate::{Gated, NoBody};
use crate::middleware::permission::{
    CustomersCreate, CustomersDelete, CustomersRead, CustomersUpdate, RequirePermission,
};
use crate::query::PaginationParams;
use crate::response::{data, Created, DataResponse};
use crate::state::AppState;

/// Query string for `GET /customers`.
#[derive(Debug, Deserialize)]
pub struct CustomerSearch {
    /// Case-insensitive substring of name, email or phone.
    pub search: Option<String>,
}

/// GET /api/v1/customers
pub async fn list(
    State(state): State<AppState>,
    _perm: RequirePermission<CustomersRead>,
    Query(params): Query<CustomerSearch>,
    Query(page): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<Customer>>>> {
    let (limit, offset) = page.resolve();
    let search = params
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let customers = CustomerRepo::list(&state.pool, search, limit, offset).await?;
    Ok(data(customers))
}

/// GET /api/v1/customers/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    _perm: RequirePermission<CustomersRead>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Customer>>> {
    let customer = CustomerRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Customer",
            id,
        }))?;
    Ok(data(customer))
}

/// POST /api/v1/customers
pub async fn create(
    State(state): State<AppState>,
    gated: Gated<CustomersCreate, CreateCustomer>,
) -> AppResult<Created<Customer>> {
    let customer = CustomerRepo::create(&state.pool, &gated.input).await?;
    tracing::info!(customer_id = customer.id, user_id = gated.user.user_id, "Customer created");
    Ok(Created(customer))
}

/// PUT /api/v1/customers/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    gated: Gated<CustomersUpdate, UpdateCustomer>,
) -> AppResult<Json<DataResponse<Customer>>> {
    let customer = CustomerRepo::update(&state.pool, id, &gated.input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Customer",
            id,
        }))?;
    tracing::info!(customer_id = id, user_id = gated.user.user_id, "Customer updated");
    Ok(data(customer))
}

/// DELETE /api/v1/customers/{id}
///
/// Soft delete. Existing appointments keep their reference; the customer can
/// no longer be attached to new ones.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    gated: Gated<CustomersDelete, NoBody>,
) -> AppResult<StatusCode> {
    if CustomerRepo::soft_delete(&state.pool, id).await? {
        tracing::info!(customer_id = id, user_id = gated.user.user_id, "Customer deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "Customer",
            id,
        }))
    }
}
