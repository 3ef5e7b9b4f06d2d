//! Transport-independent authentication engine for the Turnstile broker.
//!
//! This crate wires `turnstile-core`'s primitives and `turnstile-store`'s
//! repositories into C2-C7: the Window Controller, rate limiter, QR session
//! state machine, session issuer, admin auth, status broadcaster, and the
//! orchestrator that sequences them per request. None of it knows about
//! HTTP; `turnstile-server` is the only crate that does.

pub mod admin_auth;
pub mod broadcaster;
pub mod orchestrator;
pub mod qr_image;
pub mod qr_session;
pub mod rate_limit;
pub mod session_issuer;
pub mod window;

pub use admin_auth::{AdminAuthService, AdminClaims};
pub use broadcaster::{StatusBroadcaster, SubscriberId};
pub use orchestrator::{
    AuthOrchestrator, GenerateQrResult, QrSessions, ScanResult, ServiceLookup, SessionIssuance, UserLookup, VerifyResult,
};
pub use qr_session::QrSessionService;
pub use rate_limit::{RateLimitKey, RateLimiter};
pub use session_issuer::{SessionClaims, SessionIssuer, ValidateResult};
pub use window::WindowController;
