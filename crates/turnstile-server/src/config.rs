//! Environment-driven configuration (§6). `TURNSTILE_`-prefixed variables
//! only -- there is no `config.toml` layer here, unlike the embedded-auth
//! predecessor this crate replaces, because every setting is either a
//! startup-only seed (schedule hours) or a secret (`JWT_SECRET`,
//! `DATABASE_URL`) best left to the environment.

use std::env;
use turnstile_core::config::{AuthTimings, RateLimitConfig, ScheduleSeed};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind: String,
    pub cors_origins: Vec<String>,
    pub trusted_proxy_hops: u8,
    pub production: bool,
    pub schedule_seed: ScheduleSeed,
    pub timings: AuthTimings,
    pub rate_limits: RateLimitConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = require_env("TURNSTILE_DATABASE_URL")?;
        let jwt_secret = require_env("TURNSTILE_JWT_SECRET")?;
        if jwt_secret.len() < 32 {
            anyhow::bail!("TURNSTILE_JWT_SECRET must be at least 32 bytes");
        }

        let bind = env_or("TURNSTILE_BIND", "0.0.0.0:8080");
        let production = env_or("TURNSTILE_PRODUCTION", "false").parse().unwrap_or(false);
        let trusted_proxy_hops = env_or("TURNSTILE_TRUSTED_PROXY_HOPS", "0").parse().unwrap_or(0);

        let cors_origins = env::var("TURNSTILE_CORS_ORIGINS")
            .map(|raw| raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect())
            .unwrap_or_default();

        let default_seed = ScheduleSeed::default();
        let schedule_seed = ScheduleSeed {
            opening_hour: env_parse("TURNSTILE_OPENING_HOUR", default_seed.opening_hour),
            opening_minute: env_parse("TURNSTILE_OPENING_MINUTE", default_seed.opening_minute),
            closing_hour: env_parse("TURNSTILE_CLOSING_HOUR", default_seed.closing_hour),
            closing_minute: env_parse("TURNSTILE_CLOSING_MINUTE", default_seed.closing_minute),
            warning_minutes: env_parse("TURNSTILE_WARNING_MINUTES", default_seed.warning_minutes),
            timezone: default_seed.timezone,
        };

        let default_timings = AuthTimings::default();
        let timings = AuthTimings {
            qr_ttl_seconds: env_parse("TURNSTILE_QR_TTL_SECONDS", default_timings.qr_ttl_seconds),
            session_ttl_seconds: env_parse("TURNSTILE_SESSION_TTL_SECONDS", default_timings.session_ttl_seconds),
            pin_length: env_parse("TURNSTILE_PIN_LENGTH", default_timings.pin_length),
            admin_session_ttl_seconds: default_timings.admin_session_ttl_seconds,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            bind,
            cors_origins,
            trusted_proxy_hops,
            production,
            schedule_seed,
            timings,
            rate_limits: RateLimitConfig::default(),
        })
    }
}

fn require_env(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("missing required environment variable {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
