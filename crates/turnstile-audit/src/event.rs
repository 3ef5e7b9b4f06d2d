//! Schedule audit event type (§3 Schedule Audit Entry, §4.2).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use turnstile_core::model::ScheduleAuditAction;

/// An append-only record of one schedule mutation.
///
/// `admin_id` is `None` for system-attributed entries (automatic override
/// restore, §4.2 step 2) where no operator initiated the change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleAuditEvent {
    pub admin_id: Option<i64>,
    pub action: ScheduleAuditAction,
    pub old_value: serde_json::Value,
    pub new_value: serde_json::Value,
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ScheduleAuditEvent {
    pub fn new(
        admin_id: Option<i64>,
        action: ScheduleAuditAction,
        old_value: serde_json::Value,
        new_value: serde_json::Value,
        reason: Option<String>,
    ) -> Self {
        Self {
            admin_id,
            action,
            old_value,
            new_value,
            reason,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_system_attributed_auto_restore() {
        let event = ScheduleAuditEvent::new(
            None,
            ScheduleAuditAction::AutoRestore,
            serde_json::json!({"manual_status": "closed"}),
            serde_json::json!({"manual_status": null}),
            None,
        );
        assert!(event.admin_id.is_none());
        assert_eq!(event.action, ScheduleAuditAction::AutoRestore);
    }
}
