//! QR session state machine storage (C4, §4.4).
//!
//! The at-most-once guarantees for scan/verify live here as conditional
//! `UPDATE ... WHERE` statements: each returns the updated row only if its
//! guard predicate matched, letting the caller tell "I won the race" from
//! "someone else already did" without a separate lock.

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use turnstile_core::model::QrSession;

#[derive(Clone)]
pub struct QrSessionRepo {
    pool: PgPool,
}

impl QrSessionRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, service_id: i64, token: &str, expires_at: DateTime<Utc>) -> Result<QrSession, StoreError> {
        let row = sqlx::query_as::<_, QrSessionRow>(
            "INSERT INTO qr_sessions (token, service_id, expires_at) \
             VALUES ($1, $2, $3) \
             RETURNING token, service_id, user_auth_key, pin, created_at, expires_at, \
                       is_used, is_verified, scanned_at, verified_at",
        )
        .bind(token)
        .bind(service_id)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    pub async fn find_by_token(&self, token: &str) -> Result<Option<QrSession>, StoreError> {
        let row = sqlx::query_as::<_, QrSessionRow>(
            "SELECT token, service_id, user_auth_key, pin, created_at, expires_at, \
                    is_used, is_verified, scanned_at, verified_at \
             FROM qr_sessions WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// Attempt the CREATED -> SCANNED transition. Returns `None` if the
    /// guard (`is_used = false AND expires_at > now`) did not hold at write
    /// time -- the caller re-reads the row to pick the precise error kind.
    pub async fn try_scan(
        &self,
        token: &str,
        user_auth_key: &str,
        pin: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<QrSession>, StoreError> {
        let row = sqlx::query_as::<_, QrSessionRow>(
            "UPDATE qr_sessions \
             SET user_auth_key = $2, pin = $3, scanned_at = $4, is_used = true \
             WHERE token = $1 AND is_used = false AND expires_at > $4 \
             RETURNING token, service_id, user_auth_key, pin, created_at, expires_at, \
                       is_used, is_verified, scanned_at, verified_at",
        )
        .bind(token)
        .bind(user_auth_key)
        .bind(pin)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// Attempt the SCANNED -> VERIFIED transition. The PIN comparison itself
    /// happens application-side (constant-time, against a row fetched just
    /// before); this only commits the transition once that check passed, so
    /// the literal PIN never appears in a `WHERE` clause.
    pub async fn try_verify(&self, token: &str, now: DateTime<Utc>) -> Result<Option<QrSession>, StoreError> {
        let row = sqlx::query_as::<_, QrSessionRow>(
            "UPDATE qr_sessions \
             SET is_verified = true, verified_at = $2 \
             WHERE token = $1 AND is_verified = false AND expires_at > $2 \
             RETURNING token, service_id, user_auth_key, pin, created_at, expires_at, \
                       is_used, is_verified, scanned_at, verified_at",
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// Background sweeper: delete rows that expired more than `grace` ago.
    /// Never touches a row whose `expires_at` is still in the future, so it
    /// cannot race a live conditional update (§4.8).
    pub async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM qr_sessions WHERE expires_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct QrSessionRow {
    token: String,
    service_id: i64,
    user_auth_key: Option<String>,
    pin: Option<String>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    is_used: bool,
    is_verified: bool,
    scanned_at: Option<DateTime<Utc>>,
    verified_at: Option<DateTime<Utc>>,
}

impl From<QrSessionRow> for QrSession {
    fn from(row: QrSessionRow) -> Self {
        QrSession {
            token: row.token,
            service_id: row.service_id,
            user_auth_key: row.user_auth_key,
            pin: row.pin,
            created_at: row.created_at,
            expires_at: row.expires_at,
            is_used: row.is_used,
            is_verified: row.is_verified,
            scanned_at: row.scanned_at,
            verified_at: row.verified_at,
        }
    }
}
