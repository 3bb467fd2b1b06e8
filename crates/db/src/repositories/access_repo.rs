//! Roles, the permission catalogue, and which role holds what.
//!
//! Authorization always resolves through `users.role_id` at request time, so
//! a role change or a deactivation applies to tokens already issued.

use optique_core::types::DbId;
use sqlx::PgPool;

use crate::models::access::{Permission, Role};

const ROLE_SELECT: &str = "SELECT r.id, r.name, r.description, \
            COUNT(rp.permission_id) AS permission_count \
     FROM roles r LEFT JOIN role_permissions rp ON rp.role_id = r.id";

const PERMISSION_COLUMNS: &str = "p.id, p.resource, p.action, p.description";

pub struct AccessRepo;

impl AccessRepo {
    pub async fn find_role(pool: &PgPool, id: DbId) -> Result<Option<Role>, sqlx::Error> {
        let query = format!("{ROLE_SELECT} WHERE r.id = $1 GROUP BY r.id");
        sqlx::query_as::<_, Role>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_role_by_name(pool: &PgPool, name: &str) -> Result<Option<Role>, sqlx::Error> {
        let query = format!("{ROLE_SELECT} WHERE r.name = $1 GROUP BY r.id");
        sqlx::query_as::<_, Role>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// Roles in seed order (admin, manager, staff, then any added later).
    pub async fn list_roles(pool: &PgPool) -> Result<Vec<Role>, sqlx::Error> {
        let query = format!("{ROLE_SELECT} GROUP BY r.id ORDER BY r.id");
        sqlx::query_as::<_, Role>(&query).fetch_all(pool).await
    }

    /// The whole catalogue, grouped by resource.
    pub async fn list_permissions(pool: &PgPool) -> Result<Vec<Permission>, sqlx::Error> {
        let query =
            format!("SELECT {PERMISSION_COLUMNS} FROM permissions p ORDER BY p.resource, p.action");
        sqlx::query_as::<_, Permission>(&query)
            .fetch_all(pool)
            .await
    }

    pub async fn permissions_for_role(
        pool: &PgPool,
        role_id: DbId,
    ) -> Result<Vec<Permission>, sqlx::Error> {
        let query = format!(
            "SELECT {PERMISSION_COLUMNS}
             FROM permissions p
             JOIN role_permissions rp ON rp.permission_id = p.id
             WHERE rp.role_id = $1
             ORDER BY p.resource, p.action"
        );
        sqlx::query_as::<_, Permission>(&query)
            .bind(role_id)
            .fetch_all(pool)
            .await
    }

    /// Whether `user_id` is active and its current role grants `resource:action`.
    ///
    /// Unknown users are simply not granted anything.
    pub async fn user_can(
        pool: &PgPool,
        user_id: DbId,
        resource: &str,
        action: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM users u
                JOIN role_permissions rp ON rp.role_id = u.role_id
                JOIN permissions p ON p.id = rp.permission_id
                WHERE u.id = $1 AND u.is_active AND p.resource = $2 AND p.action = $3
             )",
        )
        .bind(user_id)
        .bind(resource)
        .bind(action)
        .fetch_one(pool)
        .await
    }

    /// Make `permission_ids` the role's exact grant set.
    ///
    /// All or nothing: an id missing from the catalogue trips the foreign key
    /// and the previous grants stay in place.
    pub async fn set_role_permissions(
        pool: &PgPool,
        role_id: DbId,
        permission_ids: &[DbId],
    ) -> Result<Vec<Permission>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO role_permissions (role_id, permission_id)
             SELECT $1, UNNEST($2::BIGINT[])
             ON CONFLICT DO NOTHING",
        )
        .bind(role_id)
        .bind(permission_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Self::permissions_for_role(pool, role_id).await
    }
}
