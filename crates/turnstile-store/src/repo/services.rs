//! Registered-service lookups (C3 identity resolution, §4.1).

use crate::error::StoreError;
use sqlx::PgPool;
use turnstile_core::model::RegisteredService;

#[derive(Clone)]
pub struct ServiceRepo {
    pool: PgPool,
}

impl ServiceRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_api_key(&self, api_key: &str) -> Result<Option<RegisteredService>, StoreError> {
        let row = sqlx::query_as::<_, ServiceRow>(
            "SELECT id, name, api_key, callback_url, is_active, created_at \
             FROM registered_services WHERE api_key = $1",
        )
        .bind(api_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<RegisteredService>, StoreError> {
        let row = sqlx::query_as::<_, ServiceRow>(
            "SELECT id, name, api_key, callback_url, is_active, created_at \
             FROM registered_services WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn create(&self, name: &str, api_key: &str, callback_url: Option<&str>) -> Result<RegisteredService, StoreError> {
        let row = sqlx::query_as::<_, ServiceRow>(
            "INSERT INTO registered_services (name, api_key, callback_url) \
             VALUES ($1, $2, $3) \
             RETURNING id, name, api_key, callback_url, is_active, created_at",
        )
        .bind(name)
        .bind(api_key)
        .bind(callback_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }
}

#[derive(sqlx::FromRow)]
struct ServiceRow {
    id: i64,
    name: String,
    api_key: String,
    callback_url: Option<String>,
    is_active: bool,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<ServiceRow> for RegisteredService {
    fn from(row: ServiceRow) -> Self {
        RegisteredService {
            id: row.id,
            name: row.name,
            api_key: row.api_key,
            callback_url: row.callback_url,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}
