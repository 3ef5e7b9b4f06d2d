//! Admin surface (§5, §6): login, schedule mutation, audit log. Every route
//! but `/login` sits behind `middleware::admin_auth::require_admin`, and the
//! schedule-mutating ones additionally require `is_super_admin`.

use axum::extract::{Query, State};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use turnstile_audit::ScheduleAuditEvent;
use turnstile_core::error::BrokerError;
use turnstile_core::model::{StatusDocument, SystemSchedule};
use turnstile_runtime::window::ToggleStatus;
use turnstile_runtime::AdminClaims;

use crate::error::ApiError;
use crate::middleware::admin_auth::require_admin;
use crate::state::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/api/admin/system/operating-hours", put(update_operating_hours))
        .route("/api/admin/system/toggle", post(toggle))
        .route("/api/admin/system/schedule", get(schedule))
        .route("/api/admin/system/audit-log", get(audit_log))
        .route_layer(from_fn_with_state(state, require_admin));

    Router::new().route("/api/admin/login", post(login)).merge(protected)
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    access_token: String,
    expires_in_seconds: i64,
}

async fn login(State(state): State<AppState>, Json(body): Json<LoginRequest>) -> Result<Json<LoginResponse>, ApiError> {
    let (access_token, expires_in_seconds) = state.admin_auth.login(&body.username, &body.password, chrono::Utc::now()).await?;
    Ok(Json(LoginResponse { access_token, expires_in_seconds }))
}

#[derive(Deserialize)]
struct UpdateHoursRequest {
    opening_hour: u8,
    opening_minute: u8,
    closing_hour: u8,
    closing_minute: u8,
    warning_minutes: u32,
}

async fn update_operating_hours(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminClaims>,
    Json(body): Json<UpdateHoursRequest>,
) -> Result<Json<StatusDocument>, ApiError> {
    require_super_admin(&admin)?;
    let doc = state
        .window
        .update_hours(
            admin.sub,
            body.opening_hour,
            body.opening_minute,
            body.closing_hour,
            body.closing_minute,
            body.warning_minutes,
            chrono::Utc::now(),
        )
        .await?;
    Ok(Json(doc))
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum ToggleRequestStatus {
    Open,
    Closed,
    Auto,
}

#[derive(Deserialize)]
struct ToggleRequest {
    status: ToggleRequestStatus,
    reason: Option<String>,
    duration_minutes: Option<i64>,
}

async fn toggle(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminClaims>,
    Json(body): Json<ToggleRequest>,
) -> Result<Json<StatusDocument>, ApiError> {
    require_super_admin(&admin)?;
    let status = match body.status {
        ToggleRequestStatus::Open => ToggleStatus::Open,
        ToggleRequestStatus::Closed => ToggleStatus::Closed,
        ToggleRequestStatus::Auto => ToggleStatus::Auto,
    };
    let doc = state.window.toggle(admin.sub, status, body.reason, body.duration_minutes, chrono::Utc::now()).await?;
    Ok(Json(doc))
}

async fn schedule(State(state): State<AppState>) -> Result<Json<SystemSchedule>, ApiError> {
    Ok(Json(state.window.schedule(chrono::Utc::now()).await?))
}

#[derive(Deserialize)]
struct AuditLogQuery {
    skip: Option<usize>,
    limit: Option<usize>,
}

async fn audit_log(
    State(state): State<AppState>,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<Vec<ScheduleAuditEvent>>, ApiError> {
    let skip = query.skip.unwrap_or(0);
    let limit = query.limit.unwrap_or(50).min(200);
    let events = state.audit.list(skip, limit).await.map_err(|err| ApiError(BrokerError::from(anyhow::anyhow!(err))))?;
    Ok(Json(events))
}

fn require_super_admin(admin: &AdminClaims) -> Result<(), ApiError> {
    if admin.is_super_admin {
        Ok(())
    } else {
        Err(ApiError(BrokerError::Forbidden))
    }
}
