//! Shared configuration value types. `turnstile-server` is the only crate
//! that knows how to *load* these (from environment variables); every other
//! crate just consumes the resulting struct, so tests can build one by hand.

use serde::{Deserialize, Serialize};

/// Seed values for the `system_schedule` singleton row, used only the first
/// time the broker boots against an empty schedule table. After that, the
/// runtime schedule lives in the database (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSeed {
    pub opening_hour: u8,
    pub opening_minute: u8,
    pub closing_hour: u8,
    pub closing_minute: u8,
    pub warning_minutes: u32,
    pub timezone: String,
}

impl Default for ScheduleSeed {
    fn default() -> Self {
        Self {
            opening_hour: 9,
            opening_minute: 0,
            closing_hour: 17,
            closing_minute: 0,
            warning_minutes: 15,
            timezone: "UTC".to_string(),
        }
    }
}

/// Max requests / window-seconds for one rate-limit class (§4.3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitRule {
    pub max_requests: u32,
    pub window_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub login: RateLimitRule,
    pub register: RateLimitRule,
    pub qr: RateLimitRule,
    pub invitation_verify: RateLimitRule,
    pub interest_submit: RateLimitRule,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            login: RateLimitRule { max_requests: 5, window_seconds: 60 },
            register: RateLimitRule { max_requests: 3, window_seconds: 300 },
            qr: RateLimitRule { max_requests: 20, window_seconds: 60 },
            invitation_verify: RateLimitRule { max_requests: 5, window_seconds: 60 },
            interest_submit: RateLimitRule { max_requests: 3, window_seconds: 3600 },
        }
    }
}

/// Endpoint classes the rate limiter is keyed on (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RateLimitClass {
    Login,
    Register,
    Qr,
    InvitationVerify,
    InterestSubmit,
}

impl RateLimitConfig {
    pub fn rule(&self, class: RateLimitClass) -> RateLimitRule {
        match class {
            RateLimitClass::Login => self.login,
            RateLimitClass::Register => self.register,
            RateLimitClass::Qr => self.qr,
            RateLimitClass::InvitationVerify => self.invitation_verify,
            RateLimitClass::InterestSubmit => self.interest_submit,
        }
    }
}

/// Session / QR / PIN timing knobs (§6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AuthTimings {
    pub qr_ttl_seconds: i64,
    pub session_ttl_seconds: i64,
    pub pin_length: u8,
    /// TTL for `POST /api/admin/login` sessions. The spec is silent on this
    /// value distinct from end-user sessions, so it defaults to the same
    /// 30 minutes (Open Question, resolved in DESIGN.md).
    pub admin_session_ttl_seconds: i64,
}

impl Default for AuthTimings {
    fn default() -> Self {
        Self {
            qr_ttl_seconds: 120,
            session_ttl_seconds: 1800,
            pin_length: 6,
            admin_session_ttl_seconds: 1800,
        }
    }
}
