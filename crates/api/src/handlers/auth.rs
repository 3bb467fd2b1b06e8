//! Sign-in, the current user, and CSRF token refresh.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use optique_core::error::CoreError;
use optique_db::models::user::{StaffMember, UserAccount};
use optique_db::repositories::{AccessRepo, UserRepo};
use serde::{Deserialize, Serialize};

use crate::auth::password::{burn_verification, verify_password};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rate_limit::{client_ip_key, PeerAddr};
use crate::response::{data, DataResponse};
use crate::state::AppState;

/// Consecutive failures that lock an account.
const MAX_FAILED_ATTEMPTS: i32 = 5;
const LOCK_DURATION_MINS: i32 = 15;

const INVALID_CREDENTIALS: &str = "Identifiant ou mot de passe incorrect.";
const ACCOUNT_DISABLED: &str = "Ce compte est désactivé.";
const ACCOUNT_LOCKED: &str = "Compte temporairement verrouillé. Réessayez plus tard.";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Returned bare (no envelope) so clients can store it as-is.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Seconds.
    pub expires_in: i64,
    /// First CSRF token of the session; refresh via `GET /auth/csrf`.
    pub csrf_token: String,
    pub user: StaffMember,
}

#[derive(Debug, Serialize)]
pub struct Me {
    #[serde(flatten)]
    pub user: StaffMember,
    /// `resource:action` strings.
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CsrfToken {
    pub csrf_token: String,
}

/// POST /api/v1/auth/login
///
/// Rate-limited per client address before any lookup.
pub async fn login(
    State(state): State<AppState>,
    PeerAddr(peer): PeerAddr,
    headers: HeaderMap,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let client = client_ip_key(peer, &headers, &state.config.trusted_proxies);
    if !state.rate_limiter.allow(&client, &state.config.rate_limit).await {
        tracing::warn!(%client, "Login rate limit exceeded");
        return Err(AppError::RateLimited);
    }

    let Some(account) = UserRepo::find_account_by_username(&state.pool, &input.username).await?
    else {
        burn_verification(&input.password);
        return Err(unauthorized());
    };

    check_can_sign_in(&account)?;

    let matches = verify_password(&input.password, &account.password_hash)
        .map_err(|e| AppError::InternalError(format!("Stored hash for user {}: {e}", account.id)))?;

    if !matches {
        let failed = UserRepo::record_failed_login(
            &state.pool,
            account.id,
            MAX_FAILED_ATTEMPTS,
            LOCK_DURATION_MINS,
        )
        .await?;
        if failed.locked_until.is_some() {
            tracing::warn!(
                user_id = account.id,
                failures = failed.failed_login_count,
                "Account locked after repeated failed logins",
            );
        }
        return Err(unauthorized());
    }

    UserRepo::record_successful_login(&state.pool, account.id).await?;

    let issued = state
        .tokens
        .issue(account.id, &account.username)
        .map_err(|e| AppError::InternalError(format!("Token signing failed: {e}")))?;
    let user = UserRepo::find_member(&state.pool, account.id)
        .await?
        .ok_or_else(|| AppError::InternalError(format!("User {} vanished", account.id)))?;

    tracing::info!(user_id = user.id, role = %user.role, "User logged in");

    Ok(Json(LoginResponse {
        access_token: issued.token,
        token_type: "Bearer",
        expires_in: issued.expires_in,
        csrf_token: state.config.csrf.issue(user.id),
        user,
    }))
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<Me>>> {
    let user = UserRepo::find_member(&state.pool, auth.user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Session invalide ou expirée. Veuillez vous reconnecter.".into(),
            ))
        })?;

    let permissions = AccessRepo::permissions_for_role(&state.pool, user.role_id)
        .await?
        .iter()
        .map(|p| p.key())
        .collect();

    Ok(data(Me { user, permissions }))
}

/// GET /api/v1/auth/csrf
pub async fn csrf_token(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Json<DataResponse<CsrfToken>> {
    data(CsrfToken {
        csrf_token: state.config.csrf.issue(auth.user_id),
    })
}

fn check_can_sign_in(account: &UserAccount) -> AppResult<()> {
    if !account.is_active {
        return Err(AppError::Core(CoreError::Forbidden(ACCOUNT_DISABLED.into())));
    }
    if account.is_locked() {
        tracing::info!(user_id = account.id, "Sign-in attempt on locked account");
        return Err(AppError::Core(CoreError::Forbidden(ACCOUNT_LOCKED.into())));
    }
    Ok(())
}

fn unauthorized() -> AppError {
    AppError::Core(CoreError::Unauthorized(INVALID_CREDENTIALS.into()))
}
