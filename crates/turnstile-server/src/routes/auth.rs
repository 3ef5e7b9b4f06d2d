//! End-user QR/PIN flow (§4.6, §6): generate, scan, verify, validate-session,
//! logout. Thin translation layer -- all policy lives in the orchestrator.

use axum::extract::{ConnectInfo, Query, State};
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::error::ApiError;
use crate::routes::client_ip;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/qr/generate", post(generate_qr))
        .route("/api/auth/qr/scan", post(scan))
        .route("/api/auth/pin/verify", post(verify))
        .route("/api/auth/validate-session", post(validate_session))
        .route("/api/auth/logout", post(logout))
}

#[derive(Deserialize)]
struct GenerateQrRequest {
    service_id: i64,
    service_api_key: String,
}

async fn generate_qr(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<GenerateQrRequest>,
) -> Result<Json<turnstile_runtime::GenerateQrResult>, ApiError> {
    let client = client_ip(&state.cfg, &headers, peer);
    let result = state
        .orchestrator
        .generate_qr(body.service_id, &body.service_api_key, &client, chrono::Utc::now())
        .await?;
    Ok(Json(result))
}

#[derive(Deserialize)]
struct ScanRequest {
    qr_token: String,
    user_auth_key: String,
}

async fn scan(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<ScanRequest>,
) -> Result<Json<turnstile_runtime::ScanResult>, ApiError> {
    let client = client_ip(&state.cfg, &headers, peer);
    let result = state
        .orchestrator
        .scan(&body.qr_token, &body.user_auth_key, &client, chrono::Utc::now())
        .await?;
    Ok(Json(result))
}

#[derive(Deserialize)]
struct VerifyRequest {
    qr_token: String,
    pin: String,
}

async fn verify(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<VerifyRequest>,
) -> Result<Json<turnstile_runtime::VerifyResult>, ApiError> {
    let client = client_ip(&state.cfg, &headers, peer);
    let user_agent = headers.get(axum::http::header::USER_AGENT).and_then(|v| v.to_str().ok());
    let result = state
        .orchestrator
        .verify(&body.qr_token, &body.pin, &client, Some(client.as_str()), user_agent, chrono::Utc::now())
        .await?;
    Ok(Json(result))
}

#[derive(Deserialize)]
struct TokenQuery {
    token: String,
}

#[derive(Serialize)]
struct ValidateSessionResponse {
    valid: bool,
    user_id: i64,
    username: String,
    expires_at: chrono::DateTime<chrono::Utc>,
}

async fn validate_session(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<ValidateSessionResponse>, ApiError> {
    let result = state.orchestrator.validate_session(&query.token, chrono::Utc::now()).await?;
    Ok(Json(ValidateSessionResponse {
        valid: true,
        user_id: result.user_id,
        username: result.username,
        expires_at: result.expires_at,
    }))
}

#[derive(Serialize)]
struct LogoutResponse {
    success: bool,
    message: &'static str,
}

async fn logout(State(state): State<AppState>, Query(query): Query<TokenQuery>) -> Result<Json<LogoutResponse>, ApiError> {
    state.orchestrator.logout(&query.token, chrono::Utc::now()).await?;
    Ok(Json(LogoutResponse { success: true, message: "logged out" }))
}
