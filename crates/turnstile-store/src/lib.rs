//! Postgres persistence for the Turnstile auth broker.
//!
//! Each repository wraps a [`sqlx::PgPool`] and speaks the domain types from
//! `turnstile-core`. State transitions that must be at-most-once (a QR scan,
//! a PIN verify) are implemented as conditional `UPDATE ... WHERE` statements
//! rather than app-level locks (§4.4), so correctness holds under concurrent
//! callers without a separate mutex layer.

pub mod error;
pub mod repo;

pub use error::StoreError;
pub use repo::admins::AdminRepo;
pub use repo::audit::PgAuditSink;
pub use repo::qr_sessions::QrSessionRepo;
pub use repo::schedule::PgScheduleRepo;
pub use repo::services::ServiceRepo;
pub use repo::sessions::SessionRepo;
pub use repo::users::UserRepo;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connect to Postgres and run pending migrations.
///
/// Mirrors the startup sequence the teacher's embedded-auth bootstrap uses
/// for SQLite: connect, migrate, then hand the pool to the caller.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}
