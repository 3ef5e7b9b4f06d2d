//! Login-history storage backing bearer-session validation and logout (C5, §4.5).

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use turnstile_core::model::LoginHistoryRecord;

#[derive(Clone)]
pub struct SessionRepo {
    pool: PgPool,
}

impl SessionRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        user_id: i64,
        service_id: i64,
        session_jti: &str,
        login_at: DateTime<Utc>,
        session_expires_at: DateTime<Utc>,
        client_ip: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<LoginHistoryRecord, StoreError> {
        let row = sqlx::query_as::<_, SessionRow>(
            "INSERT INTO login_history \
                (user_id, service_id, session_jti, login_at, session_expires_at, client_ip, user_agent) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, user_id, service_id, session_jti, login_at, session_expires_at, logout_at, client_ip, user_agent",
        )
        .bind(user_id)
        .bind(service_id)
        .bind(session_jti)
        .bind(login_at)
        .bind(session_expires_at)
        .bind(client_ip)
        .bind(user_agent)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    pub async fn find_by_jti(&self, jti: &str) -> Result<Option<LoginHistoryRecord>, StoreError> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT id, user_id, service_id, session_jti, login_at, session_expires_at, logout_at, client_ip, user_agent \
             FROM login_history WHERE session_jti = $1",
        )
        .bind(jti)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// Idempotent: repeated logout calls are a no-op past the first.
    pub async fn mark_logged_out(&self, jti: &str, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE login_history SET logout_at = $2 WHERE session_jti = $1 AND logout_at IS NULL",
        )
        .bind(jti)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Background sweeper: drop history rows older than `cutoff` (§4.8, 90d retention).
    pub async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM login_history WHERE login_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: i64,
    user_id: i64,
    service_id: i64,
    session_jti: String,
    login_at: DateTime<Utc>,
    session_expires_at: DateTime<Utc>,
    logout_at: Option<DateTime<Utc>>,
    client_ip: Option<String>,
    user_agent: Option<String>,
}

impl From<SessionRow> for LoginHistoryRecord {
    fn from(row: SessionRow) -> Self {
        LoginHistoryRecord {
            id: row.id,
            user_id: row.user_id,
            service_id: row.service_id,
            session_jti: row.session_jti,
            login_at: row.login_at,
            session_expires_at: row.session_expires_at,
            logout_at: row.logout_at,
            client_ip: row.client_ip,
            user_agent: row.user_agent,
        }
    }
}
