//! Public system status surface (§4.2, §4.7, §6): REST snapshot plus a
//! WebSocket that pushes a fresh `StatusDocument` on every change.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use turnstile_core::model::{StatusDocument, SystemSchedule};

use crate::error::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/system/status", get(status))
        .route("/api/system/operating-hours", get(operating_hours))
        .route("/api/system/ws", get(ws_upgrade))
}

async fn status(State(state): State<AppState>) -> Result<Json<StatusDocument>, ApiError> {
    Ok(Json(state.window.status(chrono::Utc::now()).await?))
}

async fn operating_hours(State(state): State<AppState>) -> Result<Json<SystemSchedule>, ApiError> {
    Ok(Json(state.window.schedule(chrono::Utc::now()).await?))
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(mut socket: WebSocket, state: AppState) {
    let (subscriber_id, mut rx) = state.broadcaster.attach().await;

    if let Ok(doc) = state.window.status(chrono::Utc::now()).await {
        if let Ok(text) = serde_json::to_string(&doc) {
            if socket.send(Message::Text(text.into())).await.is_err() {
                state.broadcaster.detach(subscriber_id).await;
                return;
            }
        }
    }

    loop {
        tokio::select! {
            update = rx.recv() => {
                match update {
                    Some(doc) => {
                        let Ok(text) = serde_json::to_string(&doc) else { continue };
                        if socket.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(_)) => break,
                }
            }
        }
    }

    state.broadcaster.detach(subscriber_id).await;
}
