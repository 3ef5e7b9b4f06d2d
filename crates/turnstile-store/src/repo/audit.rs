//! Postgres-backed [`AuditSink`], reading and writing `system_schedule_audit`.
//!
//! Schedule mutations themselves insert their audit row transactionally
//! alongside the schedule update (see `schedule.rs`); this sink exists so the
//! Window Controller can satisfy `turnstile_audit::AuditSink` for the
//! `GET /api/admin/system/audit-log` listing path without a second insert
//! path fighting the transactional one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use turnstile_audit::{AuditError, AuditSink, ScheduleAuditEvent};
use turnstile_core::model::ScheduleAuditAction;

pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    /// The authoritative write path is the transactional insert in
    /// `schedule.rs`; this is kept so generic callers that only hold an
    /// `Arc<dyn AuditSink>` can still append (e.g. future standalone tools).
    async fn record(&self, event: ScheduleAuditEvent) -> Result<(), AuditError> {
        let action_str = match event.action {
            ScheduleAuditAction::UpdateHours => "update_hours",
            ScheduleAuditAction::ManualOverride => "manual_override",
            ScheduleAuditAction::AutoRestore => "auto_restore",
        };
        sqlx::query(
            "INSERT INTO system_schedule_audit (admin_id, action, old_value, new_value, reason, timestamp) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(event.admin_id)
        .bind(action_str)
        .bind(event.old_value)
        .bind(event.new_value)
        .bind(event.reason)
        .bind(event.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| AuditError::StorageError(e.to_string()))?;
        Ok(())
    }

    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<ScheduleAuditEvent>, AuditError> {
        let rows = sqlx::query_as::<_, AuditRow>(
            "SELECT admin_id, action, old_value, new_value, reason, timestamp \
             FROM system_schedule_audit ORDER BY timestamp DESC, id DESC OFFSET $1 LIMIT $2",
        )
        .bind(offset as i64)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AuditError::QueryFailed(e.to_string()))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    admin_id: Option<i64>,
    action: String,
    old_value: serde_json::Value,
    new_value: serde_json::Value,
    reason: Option<String>,
    timestamp: DateTime<Utc>,
}

impl From<AuditRow> for ScheduleAuditEvent {
    fn from(row: AuditRow) -> Self {
        let action = match row.action.as_str() {
            "update_hours" => ScheduleAuditAction::UpdateHours,
            "manual_override" => ScheduleAuditAction::ManualOverride,
            _ => ScheduleAuditAction::AutoRestore,
        };
        ScheduleAuditEvent {
            admin_id: row.admin_id,
            action,
            old_value: row.old_value,
            new_value: row.new_value,
            reason: row.reason,
            timestamp: row.timestamp,
        }
    }
}
