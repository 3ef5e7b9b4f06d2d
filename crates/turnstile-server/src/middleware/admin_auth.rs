//! Admin bearer-token authentication middleware (§5: admin routes require a
//! session issued by `POST /api/admin/login`).

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use turnstile_core::error::BrokerError;
use turnstile_runtime::AdminClaims;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn require_admin(State(state): State<AppState>, mut req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let claims = extract_claims(&state, &req)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

fn extract_claims(state: &AppState, req: &Request<Body>) -> Result<AdminClaims, ApiError> {
    let header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(BrokerError::Unauthorized)?;
    let token = header.strip_prefix("Bearer ").ok_or(BrokerError::Unauthorized)?;
    state.admin_auth.verify_token(token).map_err(Into::into)
}
