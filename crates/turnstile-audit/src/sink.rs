//! Audit sinks.
//!
//! `AuditSink` is the seam between the schedule-mutation logic in
//! `turnstile-runtime` and wherever the entries actually end up. The
//! authoritative sink (backed by the `system_schedule_audit` table) lives in
//! `turnstile-store`, which implements this trait against its own
//! repository rather than this crate depending on `sqlx` directly — that
//! keeps `turnstile-audit` usable in unit tests with a bare in-memory sink.

use crate::error::AuditError;
use crate::event::ScheduleAuditEvent;
use async_trait::async_trait;
use std::sync::RwLock;

/// Trait for schedule-audit sinks.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: ScheduleAuditEvent) -> Result<(), AuditError>;

    /// Most-recent-first listing, for `GET /api/admin/system/audit-log`.
    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<ScheduleAuditEvent>, AuditError>;
}

/// Logs to `tracing` only; used where persistence is handled elsewhere (or
/// not needed, as in most unit tests).
pub struct ConsoleSink;

#[async_trait]
impl AuditSink for ConsoleSink {
    async fn record(&self, event: ScheduleAuditEvent) -> Result<(), AuditError> {
        tracing::info!(
            admin_id = ?event.admin_id,
            action = ?event.action,
            reason = ?event.reason,
            "schedule audit event"
        );
        Ok(())
    }

    async fn list(&self, _offset: usize, _limit: usize) -> Result<Vec<ScheduleAuditEvent>, AuditError> {
        Ok(vec![])
    }
}

/// In-memory sink, for tests that need to assert on P7 (non-decreasing
/// timestamps, pre/post snapshots present) without a database.
#[derive(Default)]
pub struct MemorySink {
    events: RwLock<Vec<ScheduleAuditEvent>>,
}

#[async_trait]
impl AuditSink for MemorySink {
    async fn record(&self, event: ScheduleAuditEvent) -> Result<(), AuditError> {
        self.events
            .write()
            .map_err(|e| AuditError::StorageError(e.to_string()))?
            .push(event);
        Ok(())
    }

    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<ScheduleAuditEvent>, AuditError> {
        let events = self
            .events
            .read()
            .map_err(|e| AuditError::StorageError(e.to_string()))?;
        Ok(events
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turnstile_core::model::ScheduleAuditAction;

    #[tokio::test]
    async fn memory_sink_lists_most_recent_first() {
        let sink = MemorySink::default();
        for i in 0..3 {
            sink.record(ScheduleAuditEvent::new(
                Some(1),
                ScheduleAuditAction::UpdateHours,
                serde_json::json!({"i": i}),
                serde_json::json!({"i": i + 1}),
                None,
            ))
            .await
            .unwrap();
        }
        let page = sink.list(0, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].new_value["i"], 3);
    }
}
