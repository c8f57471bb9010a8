use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use quillsign_core::{ClientStore, PortalError, PortalResult};

/// Durable client-side key/value storage over a single SQLite table.
///
/// Holds the session keys and per-ticket read markers; key namespaces are
/// owned by the subsystems that write them.
#[derive(Clone)]
pub struct SqliteClientStore {
    pool: SqlitePool,
}

impl SqliteClientStore {
    pub async fn connect(url: &str) -> PortalResult<Self> {
        let pool = SqlitePool::connect(url)
            .await
            .map_err(|e| PortalError::Storage(e.to_string()))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| PortalError::Storage(e.to_string()))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl ClientStore for SqliteClientStore {
    async fn get(&self, key: &str) -> PortalResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM client_kv WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortalError::Storage(e.to_string()))?;
        row.map(|r| r.try_get("value").map_err(|e| PortalError::Storage(e.to_string())))
            .transpose()
    }

    async fn put(&self, key: &str, value: &str) -> PortalResult<()> {
        sqlx::query(
            "INSERT INTO client_kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| PortalError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> PortalResult<()> {
        sqlx::query("DELETE FROM client_kv WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| PortalError::Storage(e.to_string()))?;
        Ok(())
    }
}
