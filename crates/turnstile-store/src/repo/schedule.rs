//! Singleton schedule storage backing the Window Controller (C2, §4.2).
//!
//! `update_hours`, `set_override`, and `clear_override_if_expired` each
//! persist the new row and append an audit entry in the same transaction,
//! per the "persist atomically... plus an INSERT into the audit table, both
//! in one transaction" requirement.

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use turnstile_core::model::{ManualStatus, ScheduleAuditAction, SystemSchedule};

#[derive(Clone)]
pub struct PgScheduleRepo {
    pool: PgPool,
}

impl PgScheduleRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn load(&self) -> Result<SystemSchedule, StoreError> {
        let row = sqlx::query_as::<_, ScheduleRow>(
            "SELECT opening_hour, opening_minute, closing_hour, closing_minute, warning_minutes, \
                    timezone, manual_status, override_reason, override_set_at, override_expires_at, \
                    updated_at, updated_by \
             FROM system_schedule WHERE id = 1",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update_hours(
        &self,
        admin_id: i64,
        opening_hour: u8,
        opening_minute: u8,
        closing_hour: u8,
        closing_minute: u8,
        warning_minutes: u32,
        at: DateTime<Utc>,
    ) -> Result<SystemSchedule, StoreError> {
        let mut tx = self.pool.begin().await?;

        let before = sqlx::query_as::<_, ScheduleRow>(
            "SELECT opening_hour, opening_minute, closing_hour, closing_minute, warning_minutes, \
                    timezone, manual_status, override_reason, override_set_at, override_expires_at, \
                    updated_at, updated_by \
             FROM system_schedule WHERE id = 1 FOR UPDATE",
        )
        .fetch_one(&mut *tx)
        .await?;

        let after = sqlx::query_as::<_, ScheduleRow>(
            "UPDATE system_schedule \
             SET opening_hour = $1, opening_minute = $2, closing_hour = $3, closing_minute = $4, \
                 warning_minutes = $5, updated_at = $6, updated_by = $7 \
             WHERE id = 1 \
             RETURNING opening_hour, opening_minute, closing_hour, closing_minute, warning_minutes, \
                       timezone, manual_status, override_reason, override_set_at, override_expires_at, \
                       updated_at, updated_by",
        )
        .bind(opening_hour as i16)
        .bind(opening_minute as i16)
        .bind(closing_hour as i16)
        .bind(closing_minute as i16)
        .bind(warning_minutes as i32)
        .bind(at)
        .bind(admin_id)
        .fetch_one(&mut *tx)
        .await?;

        insert_audit(
            &mut tx,
            Some(admin_id),
            ScheduleAuditAction::UpdateHours,
            &SystemSchedule::from(before),
            &SystemSchedule::from(after.clone()),
            None,
            at,
        )
        .await?;

        tx.commit().await?;
        Ok(after.into())
    }

    pub async fn set_override(
        &self,
        admin_id: i64,
        status: ManualStatus,
        reason: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> Result<SystemSchedule, StoreError> {
        let mut tx = self.pool.begin().await?;

        let before = sqlx::query_as::<_, ScheduleRow>(
            "SELECT opening_hour, opening_minute, closing_hour, closing_minute, warning_minutes, \
                    timezone, manual_status, override_reason, override_set_at, override_expires_at, \
                    updated_at, updated_by \
             FROM system_schedule WHERE id = 1 FOR UPDATE",
        )
        .fetch_one(&mut *tx)
        .await?;

        let status_str = match status {
            ManualStatus::Open => "open",
            ManualStatus::Closed => "closed",
        };

        let after = sqlx::query_as::<_, ScheduleRow>(
            "UPDATE system_schedule \
             SET manual_status = $1, override_reason = $2, override_set_at = $3, \
                 override_expires_at = $4, updated_at = $3, updated_by = $5 \
             WHERE id = 1 \
             RETURNING opening_hour, opening_minute, closing_hour, closing_minute, warning_minutes, \
                       timezone, manual_status, override_reason, override_set_at, override_expires_at, \
                       updated_at, updated_by",
        )
        .bind(status_str)
        .bind(reason)
        .bind(at)
        .bind(expires_at)
        .bind(admin_id)
        .fetch_one(&mut *tx)
        .await?;

        insert_audit(
            &mut tx,
            Some(admin_id),
            ScheduleAuditAction::ManualOverride,
            &SystemSchedule::from(before),
            &SystemSchedule::from(after.clone()),
            reason,
            at,
        )
        .await?;

        tx.commit().await?;
        Ok(after.into())
    }

    /// Explicit admin-requested clear (`status: "auto"`), unconditional on
    /// the current override state.
    pub async fn clear_override(&self, admin_id: i64, at: DateTime<Utc>) -> Result<SystemSchedule, StoreError> {
        let mut tx = self.pool.begin().await?;

        let before = sqlx::query_as::<_, ScheduleRow>(
            "SELECT opening_hour, opening_minute, closing_hour, closing_minute, warning_minutes, \
                    timezone, manual_status, override_reason, override_set_at, override_expires_at, \
                    updated_at, updated_by \
             FROM system_schedule WHERE id = 1 FOR UPDATE",
        )
        .fetch_one(&mut *tx)
        .await?;

        let after = sqlx::query_as::<_, ScheduleRow>(
            "UPDATE system_schedule \
             SET manual_status = NULL, override_reason = NULL, override_set_at = NULL, \
                 override_expires_at = NULL, updated_at = $1, updated_by = $2 \
             WHERE id = 1 \
             RETURNING opening_hour, opening_minute, closing_hour, closing_minute, warning_minutes, \
                       timezone, manual_status, override_reason, override_set_at, override_expires_at, \
                       updated_at, updated_by",
        )
        .bind(at)
        .bind(admin_id)
        .fetch_one(&mut *tx)
        .await?;

        insert_audit(
            &mut tx,
            Some(admin_id),
            ScheduleAuditAction::ManualOverride,
            &SystemSchedule::from(before),
            &SystemSchedule::from(after.clone()),
            None,
            at,
        )
        .await?;

        tx.commit().await?;
        Ok(after.into())
    }

    /// Clear an expired override, conditional on the override still being
    /// the one that was read (guards against a concurrent second
    /// expiry-check from another request being a no-op). Returns `None` if
    /// the override was already cleared or changed underneath us.
    pub async fn clear_override_if_still_expired(
        &self,
        expected_set_at: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<Option<SystemSchedule>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let before = sqlx::query_as::<_, ScheduleRow>(
            "SELECT opening_hour, opening_minute, closing_hour, closing_minute, warning_minutes, \
                    timezone, manual_status, override_reason, override_set_at, override_expires_at, \
                    updated_at, updated_by \
             FROM system_schedule WHERE id = 1 FOR UPDATE",
        )
        .fetch_one(&mut *tx)
        .await?;

        let after = sqlx::query_as::<_, ScheduleRow>(
            "UPDATE system_schedule \
             SET manual_status = NULL, override_reason = NULL, override_set_at = NULL, \
                 override_expires_at = NULL, updated_at = $2, updated_by = NULL \
             WHERE id = 1 AND override_set_at = $1 \
             RETURNING opening_hour, opening_minute, closing_hour, closing_minute, warning_minutes, \
                       timezone, manual_status, override_reason, override_set_at, override_expires_at, \
                       updated_at, updated_by",
        )
        .bind(expected_set_at)
        .bind(at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(after) = after else {
            tx.rollback().await?;
            return Ok(None);
        };

        insert_audit(
            &mut tx,
            None,
            ScheduleAuditAction::AutoRestore,
            &SystemSchedule::from(before),
            &SystemSchedule::from(after.clone()),
            None,
            at,
        )
        .await?;

        tx.commit().await?;
        Ok(Some(after.into()))
    }
}

async fn insert_audit(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    admin_id: Option<i64>,
    action: ScheduleAuditAction,
    before: &SystemSchedule,
    after: &SystemSchedule,
    reason: Option<&str>,
    at: DateTime<Utc>,
) -> Result<(), StoreError> {
    let action_str = match action {
        ScheduleAuditAction::UpdateHours => "update_hours",
        ScheduleAuditAction::ManualOverride => "manual_override",
        ScheduleAuditAction::AutoRestore => "auto_restore",
    };
    sqlx::query(
        "INSERT INTO system_schedule_audit (admin_id, action, old_value, new_value, reason, timestamp) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(admin_id)
    .bind(action_str)
    .bind(serde_json::to_value(before).map_err(|e| StoreError::Database(sqlx::Error::Decode(e.into())))?)
    .bind(serde_json::to_value(after).map_err(|e| StoreError::Database(sqlx::Error::Decode(e.into())))?)
    .bind(reason)
    .bind(at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[derive(sqlx::FromRow, Clone)]
struct ScheduleRow {
    opening_hour: i16,
    opening_minute: i16,
    closing_hour: i16,
    closing_minute: i16,
    warning_minutes: i32,
    timezone: String,
    manual_status: Option<String>,
    override_reason: Option<String>,
    override_set_at: Option<DateTime<Utc>>,
    override_expires_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
    updated_by: Option<i64>,
}

impl From<ScheduleRow> for SystemSchedule {
    fn from(row: ScheduleRow) -> Self {
        SystemSchedule {
            opening_hour: row.opening_hour as u8,
            opening_minute: row.opening_minute as u8,
            closing_hour: row.closing_hour as u8,
            closing_minute: row.closing_minute as u8,
            warning_minutes: row.warning_minutes as u32,
            timezone: row.timezone,
            manual_status: row.manual_status.map(|s| match s.as_str() {
                "open" => ManualStatus::Open,
                _ => ManualStatus::Closed,
            }),
            override_reason: row.override_reason,
            override_set_at: row.override_set_at,
            override_expires_at: row.override_expires_at,
            updated_at: row.updated_at,
            updated_by: row.updated_by,
        }
    }
}
