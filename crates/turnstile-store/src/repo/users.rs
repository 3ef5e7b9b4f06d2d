//! Active-user lookups (C3 identity resolution, §4.1).

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use turnstile_core::model::ActiveUser;

#[derive(Clone)]
pub struct UserRepo {
    pool: PgPool,
}

impl UserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_auth_key(&self, auth_key: &str) -> Result<Option<ActiveUser>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, auth_key, is_active, last_login, created_at \
             FROM active_users WHERE auth_key = $1",
        )
        .bind(auth_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<ActiveUser>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, auth_key, is_active, last_login, created_at \
             FROM active_users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn touch_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE active_users SET last_login = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    auth_key: String,
    is_active: bool,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for ActiveUser {
    fn from(row: UserRow) -> Self {
        ActiveUser {
            id: row.id,
            username: row.username,
            email: row.email,
            auth_key: row.auth_key,
            is_active: row.is_active,
            last_login: row.last_login,
            created_at: row.created_at,
        }
    }
}
