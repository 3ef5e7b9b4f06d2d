use serde::Serialize;
use thiserror::Error;

/// Typed error kinds produced by the core authentication engine.
///
/// Every variant has a fixed, generic `Display` message: the text must never
/// leak which of `InvalidService` / `InvalidUser` / `InvalidPin` is the
/// underlying cause beyond the kind itself.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerError {
    #[error("authentication service is currently closed")]
    ServiceClosed,

    #[error("too many requests")]
    RateLimited,

    #[error("invalid service credentials")]
    InvalidService,

    #[error("invalid user")]
    InvalidUser,

    #[error("unknown token")]
    UnknownToken,

    #[error("token expired")]
    TokenExpired,

    #[error("qr code already scanned")]
    AlreadyScanned,

    #[error("qr code not yet scanned")]
    NotYetScanned,

    #[error("qr code already verified")]
    AlreadyVerified,

    #[error("invalid pin")]
    InvalidPin,

    #[error("invalid session")]
    InvalidSession,

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("validation error")]
    ValidationError,

    #[error("internal error")]
    Internal,
}

impl BrokerError {
    /// Stable machine-readable kind name, used in structured logs and API bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            BrokerError::ServiceClosed => "service_closed",
            BrokerError::RateLimited => "rate_limited",
            BrokerError::InvalidService => "invalid_service",
            BrokerError::InvalidUser => "invalid_user",
            BrokerError::UnknownToken => "unknown_token",
            BrokerError::TokenExpired => "token_expired",
            BrokerError::AlreadyScanned => "already_scanned",
            BrokerError::NotYetScanned => "not_yet_scanned",
            BrokerError::AlreadyVerified => "already_verified",
            BrokerError::InvalidPin => "invalid_pin",
            BrokerError::InvalidSession => "invalid_session",
            BrokerError::Unauthorized => "unauthorized",
            BrokerError::Forbidden => "forbidden",
            BrokerError::ValidationError => "validation_error",
            BrokerError::Internal => "internal",
        }
    }
}

/// Blanket conversion for store/IO failures that don't otherwise map to a
/// more specific kind. Recovery policy: transient failures surface as
/// `Internal`; retries are the caller's responsibility.
impl From<anyhow::Error> for BrokerError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!(error = %err, "internal error");
        BrokerError::Internal
    }
}
