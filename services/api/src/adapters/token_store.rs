//! services/api/src/adapters/token_store.rs
//!
//! The concrete implementation of the `TokenStore` port: a single SQLite
//! name/value table accessed through `sqlx`.

use async_trait::async_trait;
use chrono::Utc;
use discovery_core::ports::{PortError, PortResult, TokenStore};
use sqlx::SqlitePool;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct SqliteTokenStore {
    pool: SqlitePool,
}

impl SqliteTokenStore {
    /// Creates a new `SqliteTokenStore`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// A helper function to run the embedded migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// `TokenStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl TokenStore for SqliteTokenStore {
    async fn get(&self, name: &str) -> PortResult<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT value FROM kv_store WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }

    async fn set(&self, name: &str, value: &str) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO kv_store (name, value, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT (name) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(name)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn remove(&self, name: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM kv_store WHERE name = ?1")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}
