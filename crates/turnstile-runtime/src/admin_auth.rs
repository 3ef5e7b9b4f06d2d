//! Admin authentication backing `POST /api/admin/login` (§5). Argon2id
//! password verification plus the same JWT pattern the session issuer uses
//! for end-user bearer tokens, following the teacher codebase's embedded-IdP
//! bootstrap/solicitor pair but against the `admins` table instead of a
//! local SQLite user store.

use argon2::password_hash::PasswordHash;
use argon2::{Argon2, PasswordVerifier};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use turnstile_core::error::BrokerError;
use turnstile_store::AdminRepo;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    pub sub: i64,
    pub username: String,
    pub is_super_admin: bool,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct AdminAuthService {
    secret: Vec<u8>,
    session_ttl_seconds: i64,
    admins: Arc<AdminRepo>,
}

impl AdminAuthService {
    pub fn new(secret: impl Into<Vec<u8>>, session_ttl_seconds: i64, admins: Arc<AdminRepo>) -> Self {
        Self { secret: secret.into(), session_ttl_seconds, admins }
    }

    pub async fn login(&self, username: &str, password: &str, now: DateTime<Utc>) -> Result<(String, i64), BrokerError> {
        let admin = self.admins.find_by_username(username).await.map_err(|err| anyhow::anyhow!(err))?;
        let Some(admin) = admin else {
            return Err(BrokerError::Unauthorized);
        };
        if !admin.is_active {
            return Err(BrokerError::Unauthorized);
        }

        let parsed_hash = PasswordHash::new(&admin.password_hash).map_err(|err| anyhow::anyhow!(err.to_string()))?;
        if Argon2::default().verify_password(password.as_bytes(), &parsed_hash).is_err() {
            return Err(BrokerError::Unauthorized);
        }

        let expires_at = now + chrono::Duration::seconds(self.session_ttl_seconds);
        let claims = AdminClaims {
            sub: admin.id,
            username: admin.username,
            is_super_admin: admin.is_super_admin,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(&self.secret))
            .map_err(|err| anyhow::anyhow!(err))?;
        Ok((token, self.session_ttl_seconds))
    }

    /// Decodes and verifies an admin bearer token for the admin-auth
    /// middleware. Unlike end-user sessions, there is no `login_history`
    /// cross-check: admin sessions are stateless JWTs (§4.5 applies only to
    /// end-user bearer tokens).
    pub fn verify_token(&self, token: &str) -> Result<AdminClaims, BrokerError> {
        let validation = Validation::default();
        let decoded = decode::<AdminClaims>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map_err(|_| BrokerError::Unauthorized)?;
        Ok(decoded.claims)
    }
}
