//! Staff accounts.

use chrono::Utc;
use optique_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Everything login needs to decide on a sign-in attempt.
///
/// Holds the password hash, so it never leaves the server. Handlers answer
/// with [`StaffMember`].
#[derive(Debug, Clone, FromRow)]
pub struct UserAccount {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role_id: DbId,
    /// Role name joined from `roles`.
    pub role: String,
    pub is_active: bool,
    pub last_login_at: Option<Timestamp>,
    pub failed_login_count: i32,
    pub locked_until: Option<Timestamp>,
}

impl UserAccount {
    pub fn is_locked(&self) -> bool {
        self.locked_until.is_some_and(|until| until > Utc::now())
    }
}

/// Public view of a staff account.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StaffMember {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub role: String,
    pub role_id: DbId,
    pub is_active: bool,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Insert DTO. The password is already hashed.
#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role_id: DbId,
}

/// Result of recording a failed sign-in.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct FailedLogin {
    pub failed_login_count: i32,
    /// Set when this failure crossed the lockout threshold (or an earlier one did).
    pub locked_until: Option<Timestamp>,
}
