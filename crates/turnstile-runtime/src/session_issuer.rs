//! Session Issuer (C5, §4.5): creates and validates bearer session tokens,
//! recording login history.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use turnstile_core::error::BrokerError;
use turnstile_core::model::{ActiveUser, RegisteredService};
use turnstile_store::{SessionRepo, UserRepo};
use uuid::Uuid;

/// Claims encoded in the bearer token (§6: `{sub, auth_key, service_id, jti, iat, exp}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: i64,
    pub auth_key: String,
    pub service_id: i64,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct ValidateResult {
    pub user_id: i64,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionIssuer {
    secret: Vec<u8>,
    session_ttl_seconds: i64,
    sessions: Arc<SessionRepo>,
    users: Arc<UserRepo>,
}

impl SessionIssuer {
    pub fn new(secret: impl Into<Vec<u8>>, session_ttl_seconds: i64, sessions: Arc<SessionRepo>, users: Arc<UserRepo>) -> Self {
        Self { secret: secret.into(), session_ttl_seconds, sessions, users }
    }

    /// Issues a bearer token for `user` logging into `service`, and records
    /// the corresponding login-history row. Called once, inside the same
    /// logical step as the QR `verify` transition (§4.5).
    pub async fn issue(
        &self,
        user: &ActiveUser,
        service: &RegisteredService,
        now: DateTime<Utc>,
        client_ip: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<(String, DateTime<Utc>), BrokerError> {
        let jti = Uuid::new_v4().to_string();
        let expires_at = now + chrono::Duration::seconds(self.session_ttl_seconds);

        let claims = SessionClaims {
            sub: user.id,
            auth_key: user.auth_key.clone(),
            service_id: service.id,
            jti: jti.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(&self.secret))
            .map_err(|err| anyhow::anyhow!(err))?;

        self.sessions
            .create(user.id, service.id, &jti, now, expires_at, client_ip, user_agent)
            .await
            .map_err(|err| anyhow::anyhow!(err))?;
        self.users.touch_last_login(user.id, now).await.map_err(|err| anyhow::anyhow!(err))?;

        Ok((token, expires_at))
    }

    /// `POST /api/auth/validate-session?token=` (§4.5).
    ///
    /// 1. Verify signature and decode; reject (`InvalidSession`) on failure.
    /// 2. Cross-check the `jti` against `login_history`: must exist, not be
    ///    logged out, and not be past its recorded expiry.
    pub async fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<ValidateResult, BrokerError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        let decoded = decode::<SessionClaims>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map_err(|_| BrokerError::InvalidSession)?;
        let claims = decoded.claims;

        let record = self
            .sessions
            .find_by_jti(&claims.jti)
            .await
            .map_err(|err| anyhow::anyhow!(err))?
            .ok_or(BrokerError::InvalidSession)?;

        if record.logout_at.is_some() || now >= record.session_expires_at {
            return Err(BrokerError::InvalidSession);
        }

        let user = self
            .users
            .find_by_id(record.user_id)
            .await
            .map_err(|err| anyhow::anyhow!(err))?
            .ok_or(BrokerError::InvalidSession)?;

        Ok(ValidateResult { user_id: user.id, username: user.username, expires_at: record.session_expires_at })
    }

    /// `POST /api/auth/logout?token=` (§4.5). Idempotent on `jti`: logging
    /// out twice is not an error.
    pub async fn logout(&self, token: &str, now: DateTime<Utc>) -> Result<(), BrokerError> {
        let mut validation = Validation::default();
        validation.validate_exp = false;
        let decoded = decode::<SessionClaims>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map_err(|_| BrokerError::InvalidSession)?;
        self.sessions
            .mark_logged_out(&decoded.claims.jti, now)
            .await
            .map_err(|err| anyhow::anyhow!(err))?;
        Ok(())
    }
}
