//! The root-key store (§4.4): a keyed mapping from `token_id` to the `root_key` used to
//! mint and later verify the macaroon carrying that token. Two implementations: an
//! in-memory store for tests/single-process demos, and a SQL-backed store for
//! production, mirroring the original `sqlite_macaroon_service.py`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tokio::sync::RwLock;

use crate::error::{L402Error, Result};

/// A row in the root-key store. `macaroon_blob` is kept for operator-facing audit /
/// debugging; it plays no role in validation (validation only needs `root_key`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootKeyRecord {
    pub token_id: [u8; 32],
    pub root_key: [u8; 32],
    pub macaroon_blob: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait MacaroonStore: Send + Sync {
    /// Insert a new root key under `token_id`. `token_id` is unique; implementations
    /// may treat a duplicate insert as a `StorageError`.
    async fn insert_root_key(
        &self,
        token_id: [u8; 32],
        root_key: [u8; 32],
        macaroon_blob: &str,
    ) -> Result<()>;

    /// Fetch the root key previously inserted under `token_id`, or `None`.
    async fn get_root_key(&self, token_id: [u8; 32]) -> Result<Option<[u8; 32]>>;

    /// Remove a root key, the only form of revocation this design specifies.
    async fn delete_root_key(&self, token_id: [u8; 32]) -> Result<()>;
}

/// In-memory `MacaroonStore`, backed by a `RwLock<HashMap>`. Not persistent; intended
/// for tests and single-process demos.
#[derive(Default)]
pub struct InMemoryMacaroonStore {
    records: RwLock<HashMap<[u8; 32], RootKeyRecord>>,
}

impl InMemoryMacaroonStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MacaroonStore for InMemoryMacaroonStore {
    async fn insert_root_key(
        &self,
        token_id: [u8; 32],
        root_key: [u8; 32],
        macaroon_blob: &str,
    ) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert(
            token_id,
            RootKeyRecord {
                token_id,
                root_key,
                macaroon_blob: macaroon_blob.to_string(),
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get_root_key(&self, token_id: [u8; 32]) -> Result<Option<[u8; 32]>> {
        let records = self.records.read().await;
        Ok(records.get(&token_id).map(|r| r.root_key))
    }

    async fn delete_root_key(&self, token_id: [u8; 32]) -> Result<()> {
        let mut records = self.records.write().await;
        records.remove(&token_id);
        Ok(())
    }
}

/// SQL-backed `MacaroonStore`, matching the reference schema in §6:
/// `macaroons(id, token_id UNIQUE, root_key, macaroon, created_at)` with an index on
/// `token_id`.
pub struct SqlMacaroonStore {
    pool: SqlitePool,
}

impl SqlMacaroonStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url).await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS macaroons (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                token_id BLOB UNIQUE NOT NULL,
                root_key BLOB NOT NULL,
                macaroon TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS macaroons_token_id_idx ON macaroons (token_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl MacaroonStore for SqlMacaroonStore {
    async fn insert_root_key(
        &self,
        token_id: [u8; 32],
        root_key: [u8; 32],
        macaroon_blob: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO macaroons (token_id, root_key, macaroon, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(token_id.as_slice())
        .bind(root_key.as_slice())
        .bind(macaroon_blob)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_root_key(&self, token_id: [u8; 32]) -> Result<Option<[u8; 32]>> {
        let row = sqlx::query("SELECT root_key FROM macaroons WHERE token_id = ?")
            .bind(token_id.as_slice())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let bytes: Vec<u8> = row.try_get("root_key")?;
        let root_key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| L402Error::StorageError("stored root_key is not 32 bytes".into()))?;

        Ok(Some(root_key))
    }

    async fn delete_root_key(&self, token_id: [u8; 32]) -> Result<()> {
        sqlx::query("DELETE FROM macaroons WHERE token_id = ?")
            .bind(token_id.as_slice())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

pub type SharedMacaroonStore = Arc<dyn MacaroonStore>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_store_round_trips() {
        let store = InMemoryMacaroonStore::new();
        let token_id = [1u8; 32];
        let root_key = [2u8; 32];

        store
            .insert_root_key(token_id, root_key, "blob")
            .await
            .unwrap();

        assert_eq!(store.get_root_key(token_id).await.unwrap(), Some(root_key));
        assert_eq!(store.get_root_key([9u8; 32]).await.unwrap(), None);
    }

    #[tokio::test]
    async fn in_memory_store_delete_revokes() {
        let store = InMemoryMacaroonStore::new();
        let token_id = [3u8; 32];
        store
            .insert_root_key(token_id, [4u8; 32], "blob")
            .await
            .unwrap();

        store.delete_root_key(token_id).await.unwrap();
        assert_eq!(store.get_root_key(token_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn sql_store_round_trips() {
        let store = SqlMacaroonStore::connect("sqlite::memory:").await.unwrap();
        let token_id = [5u8; 32];
        let root_key = [6u8; 32];

        store
            .insert_root_key(token_id, root_key, "blob")
            .await
            .unwrap();

        assert_eq!(store.get_root_key(token_id).await.unwrap(), Some(root_key));
        assert_eq!(store.get_root_key([7u8; 32]).await.unwrap(), None);
    }
}
