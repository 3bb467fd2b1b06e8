//! The mutation gate.
//!
//! Every write goes through [`Gated`], which runs, in order and before the
//! handler body:
//!
//! 1. authentication and the permission check for `P`,
//! 2. the caller's rate-limit bucket,
//! 3. the CSRF token (`csrf_token` body field, or `x-csrf-token` header for
//!    bodiless requests),
//! 4. JSON decoding and field validation of `T`.
//!
//! The first failure short-circuits, so nothing reaches the database for a
//! rejected request.

use std::marker::PhantomData;

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Request};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use validator::{Validate, ValidationErrors};

use super::auth::AuthUser;
use super::csrf::{CSRF_FIELD, CSRF_HEADER};
use super::permission::{require_permission, RequiredPermission};
use super::rate_limit::user_key;
use crate::error::AppError;
use crate::state::AppState;

/// A request that passed the gate for permission `P`, carrying body `T`.
pub struct Gated<P, T> {
    pub user: AuthUser,
    pub input: T,
    _permission: PhantomData<fn() -> P>,
}

/// Body type for mutations that carry nothing but the CSRF token.
#[derive(Debug, Default, Deserialize)]
pub struct NoBody {}

impl Validate for NoBody {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

impl<P, T> FromRequest<AppState> for Gated<P, T>
where
    P: RequiredPermission,
    T: DeserializeOwned + Validate + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();

        let user = AuthUser::from_request_parts(&mut parts, state).await?;
        require_permission(state, &user, P::PERMISSION).await?;

        if !state
            .rate_limiter
            .allow(&user_key(user.user_id), &state.config.rate_limit)
            .await
        {
            tracing::warn!(user_id = user.user_id, "Rate limit exceeded");
            return Err(AppError::RateLimited);
        }

        let header_token = parts
            .headers
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let bytes = Bytes::from_request(Request::from_parts(parts, body), state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let mut value: serde_json::Value = if bytes.is_empty() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_slice(&bytes)
                .map_err(|e| AppError::BadRequest(format!("Corps JSON invalide : {e}")))?
        };

        let body_token = value
            .as_object_mut()
            .and_then(|obj| obj.remove(CSRF_FIELD))
            .and_then(|v| v.as_str().map(str::to_owned));

        state
            .config
            .csrf
            .check(user.user_id, body_token.or(header_token).as_deref())?;

        let input: T = serde_json::from_value(value)
            .map_err(|e| AppError::BadRequest(format!("Corps JSON invalide : {e}")))?;
        input.validate()?;

        Ok(Gated {
            user,
            input,
            _permission: PhantomData,
        })
    }
}
