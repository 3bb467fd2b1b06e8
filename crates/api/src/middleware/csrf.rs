//! CSRF token issuing and checking for the HTTP layer.
//!
//! Tokens are bound to the authenticated user id. Signing and verification
//! live in [`optique_core::csrf`]; this module adds configuration and the
//! mapping to [`AppError::Csrf`].

use optique_core::csrf::{issue_token, verify_token, DEFAULT_TOKEN_TTL_SECS};
use optique_core::types::DbId;

use crate::config::env_or;
use crate::error::AppError;

/// Header consulted when a mutating request carries no JSON body.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Body field carrying the token on mutating requests.
pub const CSRF_FIELD: &str = "csrf_token";

#[derive(Debug, Clone)]
pub struct CsrfConfig {
    pub secret: String,
    pub ttl_secs: i64,
}

impl CsrfConfig {
    /// Reads `CSRF_SECRET` (falling back to the JWT secret) and
    /// `CSRF_TOKEN_TTL_SECS`.
    pub fn from_env(jwt_secret: &str) -> Self {
        Self {
            secret: env_or("CSRF_SECRET", jwt_secret.to_string()),
            ttl_secs: env_or("CSRF_TOKEN_TTL_SECS", DEFAULT_TOKEN_TTL_SECS),
        }
    }

    /// Issue a fresh token for `user_id`.
    pub fn issue(&self, user_id: DbId) -> String {
        issue_token(
            self.secret.as_bytes(),
            &user_id.to_string(),
            chrono::Utc::now().timestamp(),
        )
    }

    /// Check `token` against `user_id`. A missing token fails like a bad one.
    pub fn check(&self, user_id: DbId, token: Option<&str>) -> Result<(), AppError> {
        let Some(token) = token else {
            tracing::warn!(user_id, "Mutating request without CSRF token");
            return Err(AppError::Csrf);
        };
        verify_token(
            self.secret.as_bytes(),
            &user_id.to_string(),
            token,
            chrono::Utc::now().timestamp(),
            self.ttl_secs,
        )
        .map_err(|e| {
            tracing::warn!(user_id, error = %e, "CSRF token rejected");
            AppError::Csrf
        })
    }
}
