//! QR session application logic (C4, §4.4): the scan/verify error mapping
//! the conditional updates in `turnstile-store` can't express on their own,
//! plus the constant-time PIN comparison that gates the verify transition.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use turnstile_core::error::BrokerError;
use turnstile_core::idgen::{new_pin, new_token};
use turnstile_core::model::{QrSession, QrSessionState};
use turnstile_store::{QrSessionRepo, UserRepo};

pub struct QrSessionService {
    qr_sessions: Arc<QrSessionRepo>,
    users: Arc<UserRepo>,
    pin_length: u8,
}

impl QrSessionService {
    pub fn new(qr_sessions: Arc<QrSessionRepo>, users: Arc<UserRepo>, pin_length: u8) -> Self {
        Self { qr_sessions, users, pin_length }
    }

    pub async fn create(&self, service_id: i64, qr_ttl_seconds: i64, now: DateTime<Utc>) -> Result<QrSession, BrokerError> {
        let token = new_token();
        let expires_at = now + chrono::Duration::seconds(qr_ttl_seconds);
        let created = self.qr_sessions.create(service_id, &token, expires_at).await.map_err(|err| anyhow::anyhow!(err))?;
        Ok(created)
    }

    /// CREATED -> SCANNED. Returns the updated row and the freshly
    /// generated PIN. Error order follows §4.4: unknown token, expiry,
    /// unknown/inactive user, then the double-scan race.
    pub async fn scan(&self, token: &str, user_auth_key: &str, now: DateTime<Utc>) -> Result<(QrSession, String), BrokerError> {
        let existing = self
            .qr_sessions
            .find_by_token(token)
            .await
            .map_err(|err| anyhow::anyhow!(err))?
            .ok_or(BrokerError::UnknownToken)?;

        if !existing.is_live(now) {
            return Err(BrokerError::TokenExpired);
        }
        if existing.is_used {
            return Err(BrokerError::AlreadyScanned);
        }

        let user = self
            .users
            .find_by_auth_key(user_auth_key)
            .await
            .map_err(|err| anyhow::anyhow!(err))?
            .filter(|u| u.is_active)
            .ok_or(BrokerError::InvalidUser)?;

        let pin = new_pin(self.pin_length);
        match self
            .qr_sessions
            .try_scan(token, &user.auth_key, &pin, now)
            .await
            .map_err(|err| anyhow::anyhow!(err))?
        {
            Some(updated) => Ok((updated, pin)),
            // Guard didn't hold at write time -- another request won the race.
            None => Err(BrokerError::AlreadyScanned),
        }
    }

    /// SCANNED -> VERIFIED. The PIN comparison is constant-time and happens
    /// against the row read here, never inside the store's `WHERE` clause.
    pub async fn verify(&self, token: &str, pin: &str, now: DateTime<Utc>) -> Result<QrSession, BrokerError> {
        let existing = self
            .qr_sessions
            .find_by_token(token)
            .await
            .map_err(|err| anyhow::anyhow!(err))?
            .ok_or(BrokerError::UnknownToken)?;

        match existing.state_at(now) {
            QrSessionState::Verified => return Err(BrokerError::AlreadyVerified),
            QrSessionState::Expired => return Err(BrokerError::TokenExpired),
            QrSessionState::Created => return Err(BrokerError::NotYetScanned),
            QrSessionState::Scanned => {}
        }
        let Some(stored_pin) = existing.pin.as_deref() else {
            return Err(BrokerError::NotYetScanned);
        };
        if !bool::from(stored_pin.as_bytes().ct_eq(pin.as_bytes())) {
            return Err(BrokerError::InvalidPin);
        }

        match self.qr_sessions.try_verify(token, now).await.map_err(|err| anyhow::anyhow!(err))? {
            Some(updated) => Ok(updated),
            None => Err(BrokerError::AlreadyVerified),
        }
    }
}
