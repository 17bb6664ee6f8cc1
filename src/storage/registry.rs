use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::core::Result;

/// Operator-curated list of collections to track.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CollectionRegistry: Send + Sync {
    /// Newest first. Empty means "scan every known collection".
    async fn list_collection_ids(&self) -> Result<Vec<String>>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.list_collection_ids().await?.is_empty())
    }
}

pub struct SqliteCollectionRegistry {
    pool: SqlitePool,
}

impl SqliteCollectionRegistry {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let in_memory = database_url.contains(":memory:");

        let options = if database_url.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(database_url)?
        } else {
            SqliteConnectOptions::new().filename(database_url)
        }
        .create_if_missing(true);

        if !in_memory {
            let file = database_url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            let file = file.split('?').next().unwrap_or(file);
            if let Some(parent) = Path::new(file).parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
        }

        // Every connection to an in-memory database is a separate database.
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .connect_with(options)
            .await?;

        let registry = Self { pool };
        registry.initialize_schema().await?;

        Ok(registry)
    }

    async fn initialize_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                collection_id TEXT PRIMARY KEY,
                created_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        tracing::info!("✅ Collection registry schema initialized");

        Ok(())
    }

    pub async fn add_collection_id(&self, collection_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO collections (collection_id, created_at)
            VALUES (?, ?)
            ON CONFLICT(collection_id) DO NOTHING
            "#,
        )
        .bind(collection_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns whether a row was removed.
    pub async fn remove_collection_id(&self, collection_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM collections WHERE collection_id = ?")
            .bind(collection_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn has_collection_id(&self, collection_id: &str) -> Result<bool> {
        let found: Option<(String,)> =
            sqlx::query_as("SELECT collection_id FROM collections WHERE collection_id = ?")
                .bind(collection_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(found.is_some())
    }

    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM collections")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    pub async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM collections")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl CollectionRegistry for SqliteCollectionRegistry {
    async fn list_collection_ids(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT collection_id FROM collections ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
