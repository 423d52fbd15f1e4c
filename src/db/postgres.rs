use crate::db::store::{Collection, RecordStore, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;

/// Records stored as JSONB documents in a single `records` table.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects and brings the schema up to date.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        tracing::info!("Connecting to database...");
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| {
                tracing::error!("Failed to connect to database: {}", e);
                e
            })?;
        tracing::info!("Database connection established");

        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run database migrations: {}", e);
                e
            })?;
        tracing::info!("Database migrations completed");

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>, StoreError> {
        let row: Option<Json<Value>> =
            sqlx::query_scalar("SELECT data FROM records WHERE collection = $1 AND key = $2")
                .bind(collection.as_str())
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|Json(value)| value))
    }

    async fn get_all(&self, collection: Collection) -> Result<Vec<(String, Value)>, StoreError> {
        let rows: Vec<(String, Json<Value>)> =
            sqlx::query_as("SELECT key, data FROM records WHERE collection = $1 ORDER BY key")
                .bind(collection.as_str())
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(key, Json(value))| (key, value)).collect())
    }

    async fn put(&self, collection: Collection, key: &str, record: Value) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO records (collection, key, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, key)
            DO UPDATE SET data = EXCLUDED.data, updated_at = now()
            "#,
        )
        .bind(collection.as_str())
        .bind(key)
        .bind(Json(record))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn add(&self, collection: Collection, key: &str, record: Value) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO records (collection, key, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, key) DO NOTHING
            "#,
        )
        .bind(collection.as_str())
        .bind(key)
        .bind(Json(record))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Duplicate {
                collection: collection.as_str(),
                key: key.to_string(),
            });
        }
        Ok(())
    }

    async fn delete(&self, collection: Collection, key: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM records WHERE collection = $1 AND key = $2")
            .bind(collection.as_str())
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self, collection: Collection) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM records WHERE collection = $1")
            .bind(collection.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count(&self, collection: Collection) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE collection = $1")
            .bind(collection.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}
