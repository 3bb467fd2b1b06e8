//! Staff accounts and sign-in bookkeeping.

use optique_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::{FailedLogin, NewUser, StaffMember, UserAccount};

const ACCOUNT_SELECT: &str = "SELECT u.id, u.username, u.email, u.password_hash, u.role_id, \
            r.name AS role, u.is_active, u.last_login_at, u.failed_login_count, u.locked_until \
     FROM users u JOIN roles r ON r.id = u.role_id";

const MEMBER_SELECT: &str = "SELECT u.id, u.username, u.email, r.name AS role, u.role_id, \
            u.is_active, u.last_login_at, u.created_at \
     FROM users u JOIN roles r ON r.id = u.role_id";

pub struct UserRepo;

impl UserRepo {
    /// Insert an account and return its public view.
    pub async fn create(pool: &PgPool, input: &NewUser) -> Result<StaffMember, sqlx::Error> {
        let id: DbId = sqlx::query_scalar(
            "INSERT INTO users (username, email, password_hash, role_id)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(&input.username)
        .bind(&input.email)
        .bind(&input.password_hash)
        .bind(input.role_id)
        .fetch_one(pool)
        .await?;

        Self::find_member(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_account(pool: &PgPool, id: DbId) -> Result<Option<UserAccount>, sqlx::Error> {
        let query = format!("{ACCOUNT_SELECT} WHERE u.id = $1");
        sqlx::query_as::<_, UserAccount>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Usernames are matched exactly.
    pub async fn find_account_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<UserAccount>, sqlx::Error> {
        let query = format!("{ACCOUNT_SELECT} WHERE u.username = $1");
        sqlx::query_as::<_, UserAccount>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_member(pool: &PgPool, id: DbId) -> Result<Option<StaffMember>, sqlx::Error> {
        let query = format!("{MEMBER_SELECT} WHERE u.id = $1");
        sqlx::query_as::<_, StaffMember>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_members(pool: &PgPool) -> Result<Vec<StaffMember>, sqlx::Error> {
        let query = format!("{MEMBER_SELECT} ORDER BY u.username");
        sqlx::query_as::<_, StaffMember>(&query)
            .fetch_all(pool)
            .await
    }

    /// Returns `false` when no such user exists.
    pub async fn set_role(pool: &PgPool, id: DbId, role_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET role_id = $2 WHERE id = $1")
            .bind(id)
            .bind(role_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count a failed sign-in and lock the account for `lock_mins` minutes once
    /// `max_attempts` consecutive failures are reached.
    ///
    /// Counting and locking happen in one statement, so concurrent failures
    /// cannot both slip under the threshold.
    pub async fn record_failed_login(
        pool: &PgPool,
        id: DbId,
        max_attempts: i32,
        lock_mins: i32,
    ) -> Result<FailedLogin, sqlx::Error> {
        sqlx::query_as::<_, FailedLogin>(
            "UPDATE users SET
                failed_login_count = failed_login_count + 1,
                locked_until = CASE
                    WHEN failed_login_count + 1 >= $2 THEN NOW() + make_interval(mins => $3)
                    ELSE locked_until
                END
             WHERE id = $1
             RETURNING failed_login_count, locked_until",
        )
        .bind(id)
        .bind(max_attempts)
        .bind(lock_mins)
        .fetch_one(pool)
        .await
    }

    /// Clear the failure streak and any lock, and stamp `last_login_at`.
    pub async fn record_successful_login(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users
             SET failed_login_count = 0, locked_until = NULL, last_login_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }
}
