pub mod admin;
pub mod auth;
pub mod system;

use axum::http::{header, HeaderMap, Method};
use std::net::SocketAddr;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::AppConfig;

/// Builds the CORS layer from the configured origin allow-list (§4.8). An
/// empty `cors_origins` means no browser origin is allowed -- server-to-
/// server callers are unaffected, since CORS is a browser-enforced policy.
pub fn cors_layer(cfg: &AppConfig) -> CorsLayer {
    let origins: Vec<header::HeaderValue> =
        cfg.cors_origins.iter().filter_map(|o| o.parse().ok()).collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::PATCH])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Resolves the client key used for rate-limit buckets and audit rows
/// (§4.3, §4.8): the socket peer address, unless `trusted_proxy_hops` is
/// nonzero, in which case the single `X-Forwarded-For` header is trusted.
pub fn client_ip(cfg: &AppConfig, headers: &HeaderMap, peer: SocketAddr) -> String {
    if cfg.trusted_proxy_hops > 0 {
        if let Some(forwarded) = headers.get(header::HeaderName::from_static("x-forwarded-for")).and_then(|v| v.to_str().ok()) {
            if let Some(first) = forwarded.split(',').next() {
                let trimmed = first.trim();
                if !trimmed.is_empty() {
                    return trimmed.to_string();
                }
            }
        }
    }
    peer.ip().to_string()
}
