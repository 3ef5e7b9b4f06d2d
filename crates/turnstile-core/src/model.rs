//! Domain entities shared by `turnstile-store`, `turnstile-runtime`, and
//! `turnstile-server` (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ServiceId = i64;
pub type UserId = i64;
pub type AdminId = i64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredService {
    pub id: ServiceId,
    pub name: String,
    pub api_key: String,
    pub callback_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveUser {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub auth_key: String,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admin {
    pub id: AdminId,
    pub username: String,
    pub password_hash: String,
    pub is_super_admin: bool,
    pub is_active: bool,
}

/// The QR session's state, derived from its column values rather than
/// stored directly (§4.4). `Expired` is a read-time projection: it is never
/// written back except by the background sweeper deleting the row outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QrSessionState {
    Created,
    Scanned,
    Verified,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrSession {
    pub token: String,
    pub service_id: ServiceId,
    pub user_auth_key: Option<String>,
    pub pin: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub is_verified: bool,
    pub scanned_at: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,
}

impl QrSession {
    /// Project the current state at time `now` (§4.4 state machine).
    pub fn state_at(&self, now: DateTime<Utc>) -> QrSessionState {
        if self.is_verified {
            QrSessionState::Verified
        } else if now >= self.expires_at {
            QrSessionState::Expired
        } else if self.is_used {
            QrSessionState::Scanned
        } else {
            QrSessionState::Created
        }
    }

    /// A session is live iff `now < expires_at ∧ ¬is_verified` (§3).
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at && !self.is_verified
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginHistoryRecord {
    pub id: i64,
    pub user_id: UserId,
    pub service_id: ServiceId,
    /// The JWT's `jti`, not the encoded bearer token (§4.5).
    pub session_jti: String,
    pub login_at: DateTime<Utc>,
    pub session_expires_at: DateTime<Utc>,
    pub logout_at: Option<DateTime<Utc>>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManualStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSchedule {
    pub opening_hour: u8,
    pub opening_minute: u8,
    pub closing_hour: u8,
    pub closing_minute: u8,
    pub warning_minutes: u32,
    pub timezone: String,
    pub manual_status: Option<ManualStatus>,
    pub override_reason: Option<String>,
    pub override_set_at: Option<DateTime<Utc>>,
    pub override_expires_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<AdminId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleAuditAction {
    UpdateHours,
    ManualOverride,
    AutoRestore,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleAuditEntry {
    pub id: i64,
    pub admin_id: Option<AdminId>,
    pub action: ScheduleAuditAction,
    pub old_value: serde_json::Value,
    pub new_value: serde_json::Value,
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Status descriptor returned by `GET /api/system/status` and pushed by the
/// broadcaster (§4.2, §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusDocument {
    pub status: WindowStatus,
    pub warning: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes_until_close: Option<i64>,
    pub is_manual_override: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowStatus {
    Open,
    Closed,
}
