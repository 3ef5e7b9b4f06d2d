//! Shared application state: one `AppState` built at startup, cloned
//! (cheaply, via `Arc`s inside) into every axum handler via `State`.

use std::sync::Arc;
use turnstile_audit::AuditLogger;
use turnstile_runtime::{
    AuthOrchestrator, QrSessions, RateLimiter, ServiceLookup, SessionIssuance, StatusBroadcaster, UserLookup, WindowController,
};
use turnstile_store::{AdminRepo, PgAuditSink, PgScheduleRepo, QrSessionRepo, ServiceRepo, SessionRepo};

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<AppConfig>,
    pub orchestrator: Arc<AuthOrchestrator>,
    pub window: Arc<WindowController>,
    pub admin_auth: Arc<turnstile_runtime::AdminAuthService>,
    pub admins: Arc<AdminRepo>,
    pub services: Arc<ServiceRepo>,
    pub audit: Arc<AuditLogger>,
    pub broadcaster: Arc<StatusBroadcaster>,
    pub rate_limiter: Arc<RateLimiter>,
    pub store_qr_sessions: Arc<QrSessionRepo>,
    pub store_sessions: Arc<SessionRepo>,
}

impl AppState {
    pub async fn init(cfg: AppConfig) -> anyhow::Result<Self> {
        let pool = turnstile_store::connect(&cfg.database_url, 10).await?;
        seed_schedule_if_empty(&pool, &cfg).await?;

        let services = Arc::new(ServiceRepo::new(pool.clone()));
        let users = Arc::new(turnstile_store::UserRepo::new(pool.clone()));
        let admins = Arc::new(AdminRepo::new(pool.clone()));
        let qr_sessions = Arc::new(turnstile_store::QrSessionRepo::new(pool.clone()));
        let sessions = Arc::new(turnstile_store::SessionRepo::new(pool.clone()));
        let schedule_repo: Arc<dyn turnstile_runtime::window::ScheduleRepo> =
            Arc::new(PgScheduleRepo::new(pool.clone()));

        let audit_sink: Arc<dyn turnstile_audit::AuditSink> = Arc::new(PgAuditSink::new(pool.clone()));
        let audit = Arc::new(AuditLogger::new(audit_sink));

        let broadcaster = Arc::new(StatusBroadcaster::new(64));
        let window = Arc::new(WindowController::new(schedule_repo, broadcaster.clone()));
        let rate_limiter = Arc::new(RateLimiter::new(cfg.rate_limits.clone()));

        let qr = Arc::new(turnstile_runtime::QrSessionService::new(qr_sessions.clone(), users.clone(), cfg.timings.pin_length));
        let issuer = Arc::new(turnstile_runtime::SessionIssuer::new(
            cfg.jwt_secret.clone(),
            cfg.timings.session_ttl_seconds,
            sessions.clone(),
            users.clone(),
        ));

        let orchestrator = Arc::new(AuthOrchestrator::new(
            window.clone(),
            rate_limiter.clone(),
            services.clone() as Arc<dyn ServiceLookup>,
            users as Arc<dyn UserLookup>,
            qr as Arc<dyn QrSessions>,
            issuer as Arc<dyn SessionIssuance>,
            cfg.timings,
        ));

        let admin_auth = Arc::new(turnstile_runtime::AdminAuthService::new(
            cfg.jwt_secret.clone(),
            cfg.timings.admin_session_ttl_seconds,
            admins.clone(),
        ));

        bootstrap_admin_if_empty(&admins).await?;

        Ok(Self {
            cfg: Arc::new(cfg),
            orchestrator,
            window,
            admin_auth,
            admins,
            services,
            audit,
            broadcaster,
            rate_limiter,
            store_qr_sessions: qr_sessions,
            store_sessions: sessions,
        })
    }
}

async fn seed_schedule_if_empty(pool: &sqlx::PgPool, cfg: &AppConfig) -> anyhow::Result<()> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(1) FROM system_schedule").fetch_one(pool).await?;
    if count > 0 {
        return Ok(());
    }
    let seed = &cfg.schedule_seed;
    sqlx::query(
        "INSERT INTO system_schedule (id, opening_hour, opening_minute, closing_hour, closing_minute, warning_minutes, timezone) \
         VALUES (1, $1, $2, $3, $4, $5, $6)",
    )
    .bind(seed.opening_hour as i16)
    .bind(seed.opening_minute as i16)
    .bind(seed.closing_hour as i16)
    .bind(seed.closing_minute as i16)
    .bind(seed.warning_minutes as i32)
    .bind(&seed.timezone)
    .execute(pool)
    .await?;
    tracing::info!("seeded system_schedule from TURNSTILE_OPENING_HOUR/MINUTE etc.");
    Ok(())
}

/// On startup, if `admins` is empty, create a default super-admin. Mirrors
/// the teacher codebase's embedded-IdP bootstrap, against Postgres instead
/// of SQLite and the `admins` table instead of `local_users`.
async fn bootstrap_admin_if_empty(admins: &AdminRepo) -> anyhow::Result<()> {
    if admins.count().await? > 0 {
        return Ok(());
    }

    let password = std::env::var("TURNSTILE_BOOTSTRAP_ADMIN_PASSWORD").unwrap_or_default();
    if password.trim().is_empty() {
        anyhow::bail!("TURNSTILE_BOOTSTRAP_ADMIN_PASSWORD is unset or empty; set it before first startup to bootstrap the super-admin");
    }

    use argon2::password_hash::{rand_core::OsRng, SaltString};
    use argon2::{Argon2, PasswordHasher};
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    admins.create("admin", &hash, true).await?;
    tracing::warn!("bootstrapped super-admin 'admin' (set TURNSTILE_BOOTSTRAP_ADMIN_PASSWORD to control the password)");
    Ok(())
}
