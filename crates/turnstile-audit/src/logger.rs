//! Thin wrapper tying an [`AuditSink`] to structured logging.

use crate::error::AuditError;
use crate::event::ScheduleAuditEvent;
use crate::sink::AuditSink;
use std::sync::Arc;

/// The schedule-audit logger injected into the Window Controller.
pub struct AuditLogger {
    sink: Arc<dyn AuditSink>,
}

impl AuditLogger {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    pub async fn log(&self, event: ScheduleAuditEvent) -> Result<(), AuditError> {
        tracing::info!(
            admin_id = ?event.admin_id,
            action = ?event.action,
            reason = ?event.reason,
            "schedule audit event"
        );
        self.sink.record(event).await
    }

    pub async fn list(&self, offset: usize, limit: usize) -> Result<Vec<ScheduleAuditEvent>, AuditError> {
        self.sink.list(offset, limit).await
    }
}
