//! Auth Orchestrator (C6, §5): wires C1-C5 into the endpoint-level
//! operations. Transport-independent -- `turnstile-server` calls these
//! methods directly from its axum handlers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use turnstile_core::config::{AuthTimings, RateLimitClass};
use turnstile_core::error::BrokerError;
use turnstile_core::model::{ActiveUser, QrSession, RegisteredService};

use crate::qr_image::render_token_as_data_uri;
use crate::qr_session::QrSessionService;
use crate::rate_limit::{RateLimitKey, RateLimiter};
use crate::session_issuer::{SessionIssuer, ValidateResult};
use crate::window::WindowController;

/// Seam over `turnstile-store`'s `ServiceRepo`, the single lookup the
/// orchestrator needs out of it. Defined here the same way `window.rs`
/// defines `ScheduleRepo` over `PgScheduleRepo`, so `orchestrator.rs` can be
/// unit tested against an in-memory double instead of a `PgPool`.
#[async_trait]
pub trait ServiceLookup: Send + Sync {
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<RegisteredService>>;
}

#[async_trait]
impl ServiceLookup for turnstile_store::ServiceRepo {
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<RegisteredService>> {
        Ok(self.find_by_id(id).await?)
    }
}

/// Seam over `turnstile-store`'s `UserRepo`, narrowed to the lookup the
/// orchestrator needs.
#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn find_by_auth_key(&self, auth_key: &str) -> anyhow::Result<Option<ActiveUser>>;
}

#[async_trait]
impl UserLookup for turnstile_store::UserRepo {
    async fn find_by_auth_key(&self, auth_key: &str) -> anyhow::Result<Option<ActiveUser>> {
        Ok(self.find_by_auth_key(auth_key).await?)
    }
}

/// Seam over the QR session state machine (C4), narrowed to the three
/// transitions the orchestrator drives.
#[async_trait]
pub trait QrSessions: Send + Sync {
    async fn create(&self, service_id: i64, qr_ttl_seconds: i64, now: DateTime<Utc>) -> Result<QrSession, BrokerError>;
    async fn scan(&self, token: &str, user_auth_key: &str, now: DateTime<Utc>) -> Result<(QrSession, String), BrokerError>;
    async fn verify(&self, token: &str, pin: &str, now: DateTime<Utc>) -> Result<QrSession, BrokerError>;
}

#[async_trait]
impl QrSessions for QrSessionService {
    async fn create(&self, service_id: i64, qr_ttl_seconds: i64, now: DateTime<Utc>) -> Result<QrSession, BrokerError> {
        self.create(service_id, qr_ttl_seconds, now).await
    }

    async fn scan(&self, token: &str, user_auth_key: &str, now: DateTime<Utc>) -> Result<(QrSession, String), BrokerError> {
        self.scan(token, user_auth_key, now).await
    }

    async fn verify(&self, token: &str, pin: &str, now: DateTime<Utc>) -> Result<QrSession, BrokerError> {
        self.verify(token, pin, now).await
    }
}

/// Seam over the Session Issuer (C5), narrowed to the three operations the
/// orchestrator drives.
#[async_trait]
pub trait SessionIssuance: Send + Sync {
    async fn issue(
        &self,
        user: &ActiveUser,
        service: &RegisteredService,
        now: DateTime<Utc>,
        client_ip: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<(String, DateTime<Utc>), BrokerError>;
    async fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<ValidateResult, BrokerError>;
    async fn logout(&self, token: &str, now: DateTime<Utc>) -> Result<(), BrokerError>;
}

#[async_trait]
impl SessionIssuance for SessionIssuer {
    async fn issue(
        &self,
        user: &ActiveUser,
        service: &RegisteredService,
        now: DateTime<Utc>,
        client_ip: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<(String, DateTime<Utc>), BrokerError> {
        self.issue(user, service, now, client_ip, user_agent).await
    }

    async fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<ValidateResult, BrokerError> {
        self.validate(token, now).await
    }

    async fn logout(&self, token: &str, now: DateTime<Utc>) -> Result<(), BrokerError> {
        self.logout(token, now).await
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateQrResult {
    pub qr_token: String,
    pub qr_image: String,
    pub expires_in_seconds: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub success: bool,
    pub pin: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub user_id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyResult {
    pub success: bool,
    pub session_token: Option<String>,
    pub user_info: Option<UserInfo>,
    pub expires_in_seconds: Option<i64>,
}

pub struct AuthOrchestrator {
    window: Arc<WindowController>,
    rate_limiter: Arc<RateLimiter>,
    services: Arc<dyn ServiceLookup>,
    users: Arc<dyn UserLookup>,
    qr: Arc<dyn QrSessions>,
    issuer: Arc<dyn SessionIssuance>,
    timings: AuthTimings,
}

impl AuthOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        window: Arc<WindowController>,
        rate_limiter: Arc<RateLimiter>,
        services: Arc<dyn ServiceLookup>,
        users: Arc<dyn UserLookup>,
        qr: Arc<dyn QrSessions>,
        issuer: Arc<dyn SessionIssuance>,
        timings: AuthTimings,
    ) -> Self {
        Self { window, rate_limiter, services, users, qr, issuer, timings }
    }

    pub async fn generate_qr(
        &self,
        service_id: i64,
        api_key: &str,
        client_key: &str,
        now: DateTime<Utc>,
    ) -> Result<GenerateQrResult, BrokerError> {
        self.gate(RateLimitClass::Qr, client_key, now).await?;

        let service = self
            .services
            .find_by_id(service_id)
            .await
            .map_err(|err| anyhow::anyhow!(err))?
            .filter(|s| s.is_active && constant_time_eq(&s.api_key, api_key))
            .ok_or(BrokerError::InvalidService)?;

        let session = self.qr.create(service.id, self.timings.qr_ttl_seconds, now).await?;
        let qr_image = render_token_as_data_uri(&session.token)?;

        Ok(GenerateQrResult {
            qr_token: session.token,
            qr_image,
            expires_in_seconds: self.timings.qr_ttl_seconds,
        })
    }

    pub async fn scan(&self, token: &str, user_auth_key: &str, client_key: &str, now: DateTime<Utc>) -> Result<ScanResult, BrokerError> {
        self.gate(RateLimitClass::Qr, client_key, now).await?;
        let (_, pin) = self.qr.scan(token, user_auth_key, now).await?;
        Ok(ScanResult { success: true, pin: Some(pin), message: "scanned".to_string() })
    }

    pub async fn verify(
        &self,
        token: &str,
        pin: &str,
        client_key: &str,
        client_ip: Option<&str>,
        user_agent: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<VerifyResult, BrokerError> {
        self.gate(RateLimitClass::Login, client_key, now).await?;

        let session = self.qr.verify(token, pin, now).await?;

        let user_auth_key = session.user_auth_key.as_deref().ok_or(BrokerError::Internal)?;
        let user = self
            .users
            .find_by_auth_key(user_auth_key)
            .await
            .map_err(|err| anyhow::anyhow!(err))?
            .ok_or(BrokerError::InvalidUser)?;
        let service = self
            .services
            .find_by_id(session.service_id)
            .await
            .map_err(|err| anyhow::anyhow!(err))?
            .ok_or(BrokerError::InvalidService)?;

        let (session_token, expires_at) = self.issuer.issue(&user, &service, now, client_ip, user_agent).await?;

        Ok(VerifyResult {
            success: true,
            session_token: Some(session_token),
            user_info: Some(UserInfo { user_id: user.id, username: user.username }),
            expires_in_seconds: Some((expires_at - now).num_seconds()),
        })
    }

    pub async fn validate_session(&self, token: &str, now: DateTime<Utc>) -> Result<ValidateResult, BrokerError> {
        self.issuer.validate(token, now).await
    }

    pub async fn logout(&self, token: &str, now: DateTime<Utc>) -> Result<(), BrokerError> {
        self.issuer.logout(token, now).await
    }

    async fn gate(&self, class: RateLimitClass, client_key: &str, now: DateTime<Utc>) -> Result<(), BrokerError> {
        let key = RateLimitKey::new(client_key, class);
        if !self.rate_limiter.check(&key, now) {
            return Err(BrokerError::RateLimited);
        }
        if !self.window.is_open(now).await? {
            return Err(BrokerError::ServiceClosed);
        }
        Ok(())
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    use subtle::ConstantTimeEq;
    bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::ScheduleRepo;
    use std::sync::Mutex as StdMutex;
    use turnstile_core::config::RateLimitConfig;
    use turnstile_core::model::{ManualStatus, SystemSchedule};

    struct FakeSchedule(SystemSchedule);

    #[async_trait]
    impl ScheduleRepo for FakeSchedule {
        async fn load(&self) -> anyhow::Result<SystemSchedule> {
            Ok(self.0.clone())
        }

        async fn update_hours(
            &self,
            _admin_id: i64,
            _opening_hour: u8,
            _opening_minute: u8,
            _closing_hour: u8,
            _closing_minute: u8,
            _warning_minutes: u32,
            _at: DateTime<Utc>,
        ) -> anyhow::Result<SystemSchedule> {
            Ok(self.0.clone())
        }

        async fn set_override(
            &self,
            _admin_id: i64,
            _status: ManualStatus,
            _reason: Option<&str>,
            _expires_at: Option<DateTime<Utc>>,
            _at: DateTime<Utc>,
        ) -> anyhow::Result<SystemSchedule> {
            Ok(self.0.clone())
        }

        async fn clear_override(&self, _admin_id: i64, _at: DateTime<Utc>) -> anyhow::Result<SystemSchedule> {
            Ok(self.0.clone())
        }

        async fn clear_override_if_still_expired(
            &self,
            _expected_set_at: DateTime<Utc>,
            _at: DateTime<Utc>,
        ) -> anyhow::Result<Option<SystemSchedule>> {
            Ok(None)
        }
    }

    fn schedule(now: DateTime<Utc>, manual_status: Option<ManualStatus>) -> SystemSchedule {
        SystemSchedule {
            opening_hour: 9,
            opening_minute: 0,
            closing_hour: 17,
            closing_minute: 0,
            warning_minutes: 15,
            timezone: "UTC".to_string(),
            manual_status,
            override_reason: None,
            override_set_at: None,
            override_expires_at: None,
            updated_at: now,
            updated_by: None,
        }
    }

    struct FakeServices(RegisteredService);

    #[async_trait]
    impl ServiceLookup for FakeServices {
        async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<RegisteredService>> {
            Ok(if id == self.0.id { Some(self.0.clone()) } else { None })
        }
    }

    struct FakeUsers(ActiveUser);

    #[async_trait]
    impl UserLookup for FakeUsers {
        async fn find_by_auth_key(&self, auth_key: &str) -> anyhow::Result<Option<ActiveUser>> {
            Ok(if auth_key == self.0.auth_key { Some(self.0.clone()) } else { None })
        }
    }

    /// Skips the scan step's bookkeeping and always hands back a session
    /// already in the SCANNED state, since these tests exercise the
    /// orchestrator's sequencing and gating, not the QR state machine
    /// itself (covered separately once `qr_session.rs` carries its own
    /// store-backed integration tests).
    struct FakeQr {
        correct_pin: String,
        verify_attempts: StdMutex<u32>,
    }

    impl FakeQr {
        fn new(correct_pin: &str) -> Self {
            Self { correct_pin: correct_pin.to_string(), verify_attempts: StdMutex::new(0) }
        }

        fn session(&self, now: DateTime<Utc>, is_verified: bool) -> QrSession {
            QrSession {
                token: "tok-1".to_string(),
                service_id: 1,
                user_auth_key: Some("auth-key-1".to_string()),
                pin: Some(self.correct_pin.clone()),
                created_at: now,
                expires_at: now + chrono::Duration::seconds(120),
                is_used: true,
                is_verified,
                scanned_at: Some(now),
                verified_at: if is_verified { Some(now) } else { None },
            }
        }
    }

    #[async_trait]
    impl QrSessions for FakeQr {
        async fn create(&self, service_id: i64, qr_ttl_seconds: i64, now: DateTime<Utc>) -> Result<QrSession, BrokerError> {
            Ok(QrSession {
                token: "tok-1".to_string(),
                service_id,
                user_auth_key: None,
                pin: None,
                created_at: now,
                expires_at: now + chrono::Duration::seconds(qr_ttl_seconds),
                is_used: false,
                is_verified: false,
                scanned_at: None,
                verified_at: None,
            })
        }

        async fn scan(&self, _token: &str, _user_auth_key: &str, now: DateTime<Utc>) -> Result<(QrSession, String), BrokerError> {
            Ok((self.session(now, false), self.correct_pin.clone()))
        }

        async fn verify(&self, _token: &str, pin: &str, now: DateTime<Utc>) -> Result<QrSession, BrokerError> {
            *self.verify_attempts.lock().unwrap() += 1;
            if pin != self.correct_pin {
                return Err(BrokerError::InvalidPin);
            }
            Ok(self.session(now, true))
        }
    }

    struct FakeIssuer;

    #[async_trait]
    impl SessionIssuance for FakeIssuer {
        async fn issue(
            &self,
            user: &ActiveUser,
            _service: &RegisteredService,
            now: DateTime<Utc>,
            _client_ip: Option<&str>,
            _user_agent: Option<&str>,
        ) -> Result<(String, DateTime<Utc>), BrokerError> {
            Ok((format!("session-for-{}", user.id), now + chrono::Duration::seconds(1800)))
        }

        async fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<ValidateResult, BrokerError> {
            if let Some(rest) = token.strip_prefix("session-for-") {
                let user_id = rest.parse().map_err(|_| BrokerError::InvalidSession)?;
                Ok(ValidateResult { user_id, username: "alice".to_string(), expires_at: now + chrono::Duration::seconds(1800) })
            } else {
                Err(BrokerError::InvalidSession)
            }
        }

        async fn logout(&self, _token: &str, _now: DateTime<Utc>) -> Result<(), BrokerError> {
            Ok(())
        }
    }

    fn build(schedule: SystemSchedule, rate_limits: RateLimitConfig, correct_pin: &str) -> AuthOrchestrator {
        let window = Arc::new(WindowController::new(Arc::new(FakeSchedule(schedule)), Arc::new(StatusBroadcaster::new(4))));
        let service = RegisteredService {
            id: 1,
            name: "demo".to_string(),
            api_key: "api-key-1".to_string(),
            callback_url: None,
            is_active: true,
            created_at: Utc::now(),
        };
        let user = ActiveUser {
            id: 1,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            auth_key: "auth-key-1".to_string(),
            is_active: true,
            last_login: None,
            created_at: Utc::now(),
        };
        AuthOrchestrator::new(
            window,
            Arc::new(RateLimiter::new(rate_limits)),
            Arc::new(FakeServices(service)),
            Arc::new(FakeUsers(user)),
            Arc::new(FakeQr::new(correct_pin)),
            Arc::new(FakeIssuer),
            AuthTimings::default(),
        )
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-07-29T10:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[tokio::test]
    async fn happy_path_generate_scan_verify_validate() {
        let now = now();
        let orchestrator = build(schedule(now, Some(ManualStatus::Open)), RateLimitConfig::default(), "123456");

        let generated = orchestrator.generate_qr(1, "api-key-1", "client-a", now).await.unwrap();
        assert_eq!(generated.qr_token, "tok-1");

        let scanned = orchestrator.scan(&generated.qr_token, "auth-key-1", "client-a", now).await.unwrap();
        assert!(scanned.success);

        let verified = orchestrator.verify(&generated.qr_token, "123456", "client-a", None, None, now).await.unwrap();
        assert!(verified.success);
        let token = verified.session_token.expect("session token on successful verify");

        let validated = orchestrator.validate_session(&token, now).await.unwrap();
        assert_eq!(validated.user_id, 1);
    }

    #[tokio::test]
    async fn wrong_pin_then_rate_limited() {
        let now = now();
        let limits = RateLimitConfig { login: turnstile_core::config::RateLimitRule { max_requests: 3, window_seconds: 60 }, ..RateLimitConfig::default() };
        let orchestrator = build(schedule(now, Some(ManualStatus::Open)), limits, "123456");

        for _ in 0..3 {
            let err = orchestrator.verify("tok-1", "000000", "client-b", None, None, now).await.unwrap_err();
            assert_eq!(err, BrokerError::InvalidPin);
        }

        let err = orchestrator.verify("tok-1", "000000", "client-b", None, None, now).await.unwrap_err();
        assert_eq!(err, BrokerError::RateLimited);
    }

    #[tokio::test]
    async fn closed_window_rejects_generate() {
        let now = now();
        let orchestrator = build(schedule(now, Some(ManualStatus::Closed)), RateLimitConfig::default(), "123456");

        let err = orchestrator.generate_qr(1, "api-key-1", "client-c", now).await.unwrap_err();
        assert_eq!(err, BrokerError::ServiceClosed);
    }
}
