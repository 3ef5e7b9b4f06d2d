//! Window Controller (C2, §4.2): decides whether authentication requests are
//! currently allowed, folding the weekly schedule, manual overrides, and the
//! pre-close warning band into one status read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::str::FromStr;
use std::sync::Arc;
use turnstile_core::error::BrokerError;
use turnstile_core::model::{ManualStatus, ScheduleAuditAction, StatusDocument, SystemSchedule, WindowStatus};

use crate::broadcaster::StatusBroadcaster;

/// Seam over the schedule singleton, implemented by `turnstile-store`'s
/// `PgScheduleRepo` (defined here rather than in `turnstile-store` itself so
/// that crate stays free of a dependency back on this one).
#[async_trait]
pub trait ScheduleRepo: Send + Sync {
    async fn load(&self) -> anyhow::Result<SystemSchedule>;

    #[allow(clippy::too_many_arguments)]
    async fn update_hours(
        &self,
        admin_id: i64,
        opening_hour: u8,
        opening_minute: u8,
        closing_hour: u8,
        closing_minute: u8,
        warning_minutes: u32,
        at: DateTime<Utc>,
    ) -> anyhow::Result<SystemSchedule>;

    async fn set_override(
        &self,
        admin_id: i64,
        status: ManualStatus,
        reason: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> anyhow::Result<SystemSchedule>;

    async fn clear_override(&self, admin_id: i64, at: DateTime<Utc>) -> anyhow::Result<SystemSchedule>;

    async fn clear_override_if_still_expired(
        &self,
        expected_set_at: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Option<SystemSchedule>>;
}

#[async_trait]
impl ScheduleRepo for turnstile_store::PgScheduleRepo {
    async fn load(&self) -> anyhow::Result<SystemSchedule> {
        Ok(self.load().await?)
    }

    async fn update_hours(
        &self,
        admin_id: i64,
        opening_hour: u8,
        opening_minute: u8,
        closing_hour: u8,
        closing_minute: u8,
        warning_minutes: u32,
        at: DateTime<Utc>,
    ) -> anyhow::Result<SystemSchedule> {
        Ok(self
            .update_hours(admin_id, opening_hour, opening_minute, closing_hour, closing_minute, warning_minutes, at)
            .await?)
    }

    async fn set_override(
        &self,
        admin_id: i64,
        status: ManualStatus,
        reason: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> anyhow::Result<SystemSchedule> {
        Ok(self.set_override(admin_id, status, reason, expires_at, at).await?)
    }

    async fn clear_override(&self, admin_id: i64, at: DateTime<Utc>) -> anyhow::Result<SystemSchedule> {
        Ok(self.clear_override(admin_id, at).await?)
    }

    async fn clear_override_if_still_expired(
        &self,
        expected_set_at: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Option<SystemSchedule>> {
        Ok(self.clear_override_if_still_expired(expected_set_at, at).await?)
    }
}

/// `open | closed | auto` as accepted by `POST /api/admin/system/toggle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleStatus {
    Open,
    Closed,
    Auto,
}

pub struct WindowController {
    repo: Arc<dyn ScheduleRepo>,
    broadcaster: Arc<StatusBroadcaster>,
}

impl WindowController {
    pub fn new(repo: Arc<dyn ScheduleRepo>, broadcaster: Arc<StatusBroadcaster>) -> Self {
        Self { repo, broadcaster }
    }

    /// §4.2 steps 1-3: load, auto-restore an expired override if present,
    /// then fall through to the scheduled-hours check.
    pub async fn is_open(&self, now: DateTime<Utc>) -> Result<bool, BrokerError> {
        let schedule = self.resolve(now).await?;
        Ok(self.evaluate(&schedule, now))
    }

    pub async fn status(&self, now: DateTime<Utc>) -> Result<StatusDocument, BrokerError> {
        let schedule = self.resolve(now).await?;
        Ok(self.describe(&schedule, now))
    }

    pub async fn schedule(&self, now: DateTime<Utc>) -> Result<SystemSchedule, BrokerError> {
        self.resolve(now).await
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
        now: DateTime<Utc>,
    ) -> Result<StatusDocument, BrokerError> {
        if opening_hour > 23
            || closing_hour > 23
            || opening_minute > 59
            || closing_minute > 59
            || (opening_hour as u32 * 60 + opening_minute as u32) >= (closing_hour as u32 * 60 + closing_minute as u32)
        {
            return Err(BrokerError::ValidationError);
        }

        let after = self
            .repo
            .update_hours(admin_id, opening_hour, opening_minute, closing_hour, closing_minute, warning_minutes, now)
            .await
            .map_err(anyhow_to_broker)?;

        tracing::info!(admin_id, action = "update_hours", "schedule updated");
        let doc = self.describe(&after, now);
        self.broadcaster.publish(doc.clone()).await;
        Ok(doc)
    }

    pub async fn toggle(
        &self,
        admin_id: i64,
        status: ToggleStatus,
        reason: Option<String>,
        duration_minutes: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<StatusDocument, BrokerError> {
        let after = match status {
            ToggleStatus::Auto => self.repo.clear_override(admin_id, now).await.map_err(anyhow_to_broker)?,
            ToggleStatus::Open | ToggleStatus::Closed => {
                let manual = if status == ToggleStatus::Open { ManualStatus::Open } else { ManualStatus::Closed };
                let expires_at = duration_minutes.map(|m| now + chrono::Duration::minutes(m));
                self.repo
                    .set_override(admin_id, manual, reason.as_deref(), expires_at, now)
                    .await
                    .map_err(anyhow_to_broker)?
            }
        };

        let action = if status == ToggleStatus::Auto { ScheduleAuditAction::AutoRestore } else { ScheduleAuditAction::ManualOverride };
        tracing::info!(admin_id, action = ?action, reason = reason.as_deref(), "schedule override changed");
        let doc = self.describe(&after, now);
        self.broadcaster.publish(doc.clone()).await;
        Ok(doc)
    }

    async fn resolve(&self, now: DateTime<Utc>) -> Result<SystemSchedule, BrokerError> {
        let schedule = self.repo.load().await.map_err(anyhow_to_broker)?;
        let Some(expires_at) = schedule.override_expires_at else {
            return Ok(schedule);
        };
        if schedule.manual_status.is_none() || now < expires_at {
            return Ok(schedule);
        }
        let Some(set_at) = schedule.override_set_at else {
            return Ok(schedule);
        };
        match self.repo.clear_override_if_still_expired(set_at, now).await.map_err(anyhow_to_broker)? {
            Some(restored) => {
                tracing::info!(action = "auto_restore", "schedule override expired, restored to scheduled hours");
                self.broadcaster.publish(self.describe(&restored, now)).await;
                Ok(restored)
            }
            // Lost the race to another concurrent expiry-check; reload the
            // (now-restored) row rather than acting on a stale snapshot.
            None => self.repo.load().await.map_err(anyhow_to_broker),
        }
    }

    fn evaluate(&self, schedule: &SystemSchedule, now: DateTime<Utc>) -> bool {
        if let Some(manual) = schedule.manual_status {
            return manual == ManualStatus::Open;
        }
        let Ok(tz) = Tz::from_str(&schedule.timezone) else {
            return false;
        };
        let local = now.with_timezone(&tz);
        let minute_of_day = local.format("%H").to_string().parse::<i64>().unwrap_or(0) * 60
            + local.format("%M").to_string().parse::<i64>().unwrap_or(0);
        let opening = schedule.opening_hour as i64 * 60 + schedule.opening_minute as i64;
        let closing = schedule.closing_hour as i64 * 60 + schedule.closing_minute as i64;
        minute_of_day >= opening && minute_of_day < closing
    }

    fn describe(&self, schedule: &SystemSchedule, now: DateTime<Utc>) -> StatusDocument {
        let is_manual_override = schedule.manual_status.is_some();
        let open = self.evaluate(schedule, now);
        let status = if open { WindowStatus::Open } else { WindowStatus::Closed };

        let minutes_until_close = if open && !is_manual_override {
            Tz::from_str(&schedule.timezone).ok().map(|tz| {
                let local = now.with_timezone(&tz);
                let minute_of_day = local.format("%H").to_string().parse::<i64>().unwrap_or(0) * 60
                    + local.format("%M").to_string().parse::<i64>().unwrap_or(0);
                let closing = schedule.closing_hour as i64 * 60 + schedule.closing_minute as i64;
                closing - minute_of_day
            })
        } else {
            None
        };

        let warning = !is_manual_override
            && open
            && minutes_until_close.is_some_and(|m| m <= schedule.warning_minutes as i64);

        let message = if is_manual_override {
            match schedule.manual_status {
                Some(ManualStatus::Open) => "service manually opened".to_string(),
                _ => "service manually closed".to_string(),
            }
        } else if open {
            "service open".to_string()
        } else {
            "service closed".to_string()
        };

        StatusDocument {
            status,
            warning,
            message,
            minutes_until_close,
            is_manual_override,
            override_reason: schedule.override_reason.clone(),
            override_expires_at: schedule.override_expires_at,
        }
    }

}

fn anyhow_to_broker(err: anyhow::Error) -> BrokerError {
    BrokerError::from(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    struct FakeRepo {
        schedule: StdMutex<SystemSchedule>,
    }

    #[async_trait]
    impl ScheduleRepo for FakeRepo {
        async fn load(&self) -> anyhow::Result<SystemSchedule> {
            Ok(self.schedule.lock().unwrap().clone())
        }

        async fn update_hours(
            &self,
            _admin_id: i64,
            opening_hour: u8,
            opening_minute: u8,
            closing_hour: u8,
            closing_minute: u8,
            warning_minutes: u32,
            at: DateTime<Utc>,
        ) -> anyhow::Result<SystemSchedule> {
            let mut s = self.schedule.lock().unwrap();
            s.opening_hour = opening_hour;
            s.opening_minute = opening_minute;
            s.closing_hour = closing_hour;
            s.closing_minute = closing_minute;
            s.warning_minutes = warning_minutes;
            s.updated_at = at;
            Ok(s.clone())
        }

        async fn set_override(
            &self,
            _admin_id: i64,
            status: ManualStatus,
            reason: Option<&str>,
            expires_at: Option<DateTime<Utc>>,
            at: DateTime<Utc>,
        ) -> anyhow::Result<SystemSchedule> {
            let mut s = self.schedule.lock().unwrap();
            s.manual_status = Some(status);
            s.override_reason = reason.map(str::to_string);
            s.override_set_at = Some(at);
            s.override_expires_at = expires_at;
            Ok(s.clone())
        }

        async fn clear_override(&self, _admin_id: i64, at: DateTime<Utc>) -> anyhow::Result<SystemSchedule> {
            let mut s = self.schedule.lock().unwrap();
            s.manual_status = None;
            s.override_reason = None;
            s.override_set_at = None;
            s.override_expires_at = None;
            s.updated_at = at;
            Ok(s.clone())
        }

        async fn clear_override_if_still_expired(
            &self,
            expected_set_at: DateTime<Utc>,
            at: DateTime<Utc>,
        ) -> anyhow::Result<Option<SystemSchedule>> {
            let mut s = self.schedule.lock().unwrap();
            if s.override_set_at != Some(expected_set_at) {
                return Ok(None);
            }
            s.manual_status = None;
            s.override_reason = None;
            s.override_set_at = None;
            s.override_expires_at = None;
            s.updated_at = at;
            Ok(Some(s.clone()))
        }
    }

    fn base_schedule(now: DateTime<Utc>) -> SystemSchedule {
        SystemSchedule {
            opening_hour: 9,
            opening_minute: 0,
            closing_hour: 17,
            closing_minute: 0,
            warning_minutes: 15,
            timezone: "UTC".to_string(),
            manual_status: None,
            override_reason: None,
            override_set_at: None,
            override_expires_at: None,
            updated_at: now,
            updated_by: None,
        }
    }

    fn controller(schedule: SystemSchedule) -> WindowController {
        let repo = Arc::new(FakeRepo { schedule: StdMutex::new(schedule) });
        let broadcaster = Arc::new(StatusBroadcaster::new(16));
        WindowController::new(repo, broadcaster)
    }

    #[tokio::test]
    async fn closed_window_denies_outside_hours() {
        let now = DateTime::parse_from_rfc3339("2026-07-29T20:00:00Z").unwrap().with_timezone(&Utc);
        let ctrl = controller(base_schedule(now));
        assert!(!ctrl.is_open(now).await.unwrap());
    }

    #[tokio::test]
    async fn manual_override_wins_over_schedule() {
        let now = DateTime::parse_from_rfc3339("2026-07-29T10:00:00Z").unwrap().with_timezone(&Utc);
        let ctrl = controller(base_schedule(now));
        ctrl.toggle(1, ToggleStatus::Closed, Some("maintenance".into()), None, now).await.unwrap();
        assert!(!ctrl.is_open(now).await.unwrap());
    }

    #[tokio::test]
    async fn override_auto_restores_past_expiry() {
        let now = DateTime::parse_from_rfc3339("2026-07-29T10:00:00Z").unwrap().with_timezone(&Utc);
        let ctrl = controller(base_schedule(now));
        ctrl.toggle(1, ToggleStatus::Closed, None, Some(5), now).await.unwrap();
        let later = now + chrono::Duration::minutes(6);
        assert!(ctrl.is_open(later).await.unwrap());
    }

    #[tokio::test]
    async fn warning_band_near_close() {
        let now = DateTime::parse_from_rfc3339("2026-07-29T16:50:00Z").unwrap().with_timezone(&Utc);
        let ctrl = controller(base_schedule(now));
        let status = ctrl.status(now).await.unwrap();
        assert!(status.warning);
    }
}
