//! Admin credential lookups backing `POST /api/admin/login` (§5).

use crate::error::StoreError;
use sqlx::PgPool;
use turnstile_core::model::Admin;

#[derive(Clone)]
pub struct AdminRepo {
    pool: PgPool,
}

impl AdminRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<Admin>, StoreError> {
        let row = sqlx::query_as::<_, AdminRow>(
            "SELECT id, username, password_hash, is_super_admin, is_active \
             FROM admins WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// Used by the bootstrap step on startup when `admins` is empty.
    pub async fn count(&self) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(1) FROM admins").fetch_one(&self.pool).await?;
        Ok(count)
    }

    pub async fn create(&self, username: &str, password_hash: &str, is_super_admin: bool) -> Result<Admin, StoreError> {
        let row = sqlx::query_as::<_, AdminRow>(
            "INSERT INTO admins (username, password_hash, is_super_admin) \
             VALUES ($1, $2, $3) \
             RETURNING id, username, password_hash, is_super_admin, is_active",
        )
        .bind(username)
        .bind(password_hash)
        .bind(is_super_admin)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }
}

#[derive(sqlx::FromRow)]
struct AdminRow {
    id: i64,
    username: String,
    password_hash: String,
    is_super_admin: bool,
    is_active: bool,
}

impl From<AdminRow> for Admin {
    fn from(row: AdminRow) -> Self {
        Admin {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            is_super_admin: row.is_super_admin,
            is_active: row.is_active,
        }
    }
}
