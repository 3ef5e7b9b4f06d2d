//! axum HTTP + WebSocket boundary for the Turnstile auth broker (C8, §4.8).
//!
//! Exposes [`run`] so `turnstile-cli` can own process startup (config load,
//! exit codes) while this crate owns the router and request handling.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use std::net::SocketAddr;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::state::AppState;

/// Connects, migrates, builds the router, and serves until the process is
/// killed. Returns an error on anything that should surface as a fatal
/// startup failure (bad config already having been checked by the caller,
/// unreachable database here).
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let state = AppState::init(cfg).await?;

    spawn_sweeper(state.clone());

    let cors = routes::cors_layer(&state.cfg);
    let bind = state.cfg.bind.clone();

    let app = axum::Router::new()
        .merge(routes::auth::router())
        .merge(routes::system::router())
        .merge(routes::admin::router(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(tower::timeout::TimeoutLayer::new(Duration::from_secs(5)))
        .with_state(state);

    tracing::info!(%bind, "turnstile-server listening");
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

/// §9 background sweeper: every 5 minutes, delete QR sessions expired more
/// than an hour ago, login-history rows older than 90 days, and evict idle
/// rate-limiter buckets. Never mutates a live row, so it never races an
/// in-flight conditional update. Each DB step gets a few retries with
/// exponential backoff before it gives up until the next tick (§7).
fn spawn_sweeper(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5 * 60));
        loop {
            interval.tick().await;
            let now = chrono::Utc::now();

            let qr_cutoff = now - chrono::Duration::hours(1);
            match retry_with_backoff("qr session sweep", || state.store_qr_sessions.delete_expired_before(qr_cutoff)).await {
                Some(n) if n > 0 => tracing::info!(deleted = n, "swept expired qr sessions"),
                _ => {}
            }

            let login_cutoff = now - chrono::Duration::days(90);
            match retry_with_backoff("login history sweep", || state.store_sessions.delete_older_than(login_cutoff)).await {
                Some(n) if n > 0 => tracing::info!(deleted = n, "swept stale login history"),
                _ => {}
            }

            state.rate_limiter.evict_idle(now);
        }
    });
}

/// Up to 3 attempts, doubling the delay from 1s. Returns `None` (and has
/// already logged via `tracing::warn!`) once attempts are exhausted.
async fn retry_with_backoff<F, Fut, T, E>(op: &str, mut f: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = Duration::from_secs(1);
    for attempt in 1..=3 {
        match f().await {
            Ok(value) => return Some(value),
            Err(err) if attempt < 3 => {
                tracing::warn!(error = %err, attempt, op, "sweep step failed, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(err) => {
                tracing::warn!(error = %err, attempt, op, "sweep step failed, giving up until next tick");
            }
        }
    }
    None
}
