//! Maps `BrokerError` onto HTTP responses (C8, §7). The JSON body exposes
//! only `error` (the stable `kind()` string) and `message` (the fixed,
//! generic `Display` text) -- never anything more specific than the kind.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use turnstile_core::error::BrokerError;

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

pub struct ApiError(pub BrokerError);

impl From<BrokerError> for ApiError {
    fn from(err: BrokerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            BrokerError::ServiceClosed => StatusCode::SERVICE_UNAVAILABLE,
            BrokerError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            BrokerError::InvalidService => StatusCode::UNAUTHORIZED,
            BrokerError::InvalidUser => StatusCode::BAD_REQUEST,
            BrokerError::UnknownToken => StatusCode::BAD_REQUEST,
            BrokerError::TokenExpired => StatusCode::BAD_REQUEST,
            BrokerError::AlreadyScanned => StatusCode::BAD_REQUEST,
            BrokerError::NotYetScanned => StatusCode::BAD_REQUEST,
            BrokerError::AlreadyVerified => StatusCode::BAD_REQUEST,
            BrokerError::InvalidPin => StatusCode::UNAUTHORIZED,
            BrokerError::InvalidSession => StatusCode::UNAUTHORIZED,
            BrokerError::Unauthorized => StatusCode::UNAUTHORIZED,
            BrokerError::Forbidden => StatusCode::FORBIDDEN,
            BrokerError::ValidationError => StatusCode::BAD_REQUEST,
            BrokerError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody { error: self.0.kind(), message: self.0.to_string() })).into_response()
    }
}
