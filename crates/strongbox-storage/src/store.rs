// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the KeyValueStore trait.

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use strongbox_config::model::StorageConfig;
use strongbox_core::{KeyValueStore, Namespace, StrongboxError};
use tracing::trace;

use crate::database::{map_tr_err, Database};

/// `kv_entries`-backed store. Each `put` is a single-row upsert, so every
/// individual write is atomic.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open the database described by `config`.
    pub async fn open(config: &StorageConfig) -> Result<Self, StrongboxError> {
        let db = Database::open(&config.database_path, config.wal_mode).await?;
        Ok(Self::new(db))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn put(&self, namespace: Namespace, key: &str, value: &[u8]) -> Result<(), StrongboxError> {
        let ns = namespace.to_string();
        let key = key.to_string();
        let value = value.to_vec();
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO kv_entries (namespace, key, value, updated_at)
                     VALUES (?1, ?2, ?3, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                     ON CONFLICT (namespace, key)
                     DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                    params![ns, key, value],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        trace!(%namespace, "kv put");
        Ok(())
    }

    async fn get(&self, namespace: Namespace, key: &str) -> Result<Option<Vec<u8>>, StrongboxError> {
        let ns = namespace.to_string();
        let key = key.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<Option<Vec<u8>>, rusqlite::Error> {
                conn.query_row(
                    "SELECT value FROM kv_entries WHERE namespace = ?1 AND key = ?2",
                    params![ns, key],
                    |row| row.get(0),
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn delete(&self, namespace: Namespace, key: &str) -> Result<(), StrongboxError> {
        let ns = namespace.to_string();
        let key = key.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "DELETE FROM kv_entries WHERE namespace = ?1 AND key = ?2",
                    params![ns, key],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn exists(&self, namespace: Namespace, key: &str) -> Result<bool, StrongboxError> {
        let ns = namespace.to_string();
        let key = key.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<bool, rusqlite::Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM kv_entries WHERE namespace = ?1 AND key = ?2",
                    params![ns, key],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn keys(&self, namespace: Namespace) -> Result<Vec<String>, StrongboxError> {
        let ns = namespace.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt =
                    conn.prepare("SELECT key FROM kv_entries WHERE namespace = ?1 ORDER BY key")?;
                let rows = stmt.query_map(params![ns], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .map_err(map_tr_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn open_test_store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kv.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();
        (SqliteStore::new(db), dir)
    }

    #[tokio::test]
    async fn put_get_roundtrip() {
        let (store, _dir) = open_test_store().await;
        store.put(Namespace::Kek, "1", b"wrapped").await.unwrap();
        assert_eq!(
            store.get(Namespace::Kek, "1").await.unwrap().as_deref(),
            Some(&b"wrapped"[..])
        );
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let (store, _dir) = open_test_store().await;
        assert!(store.get(Namespace::Salt, "9").await.unwrap().is_none());
        assert!(!store.exists(Namespace::Salt, "9").await.unwrap());
    }

    #[tokio::test]
    async fn put_overwrites_existing_value() {
        let (store, _dir) = open_test_store().await;
        store.put(Namespace::Metadata, "vault", b"v1").await.unwrap();
        store.put(Namespace::Metadata, "vault", b"v2").await.unwrap();
        assert_eq!(
            store.get(Namespace::Metadata, "vault").await.unwrap().unwrap(),
            b"v2"
        );
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let (store, _dir) = open_test_store().await;
        store.put(Namespace::Kek, "1", b"kek").await.unwrap();
        store.put(Namespace::Salt, "1", b"salt").await.unwrap();
        assert_eq!(store.get(Namespace::Kek, "1").await.unwrap().unwrap(), b"kek");
        assert_eq!(store.keys(Namespace::Pin).await.unwrap(), Vec::<String>::new());
    }

    #[tokio::test]
    async fn delete_removes_and_is_idempotent() {
        let (store, _dir) = open_test_store().await;
        store.put(Namespace::Credentials, "1/abc", b"x").await.unwrap();
        store.delete(Namespace::Credentials, "1/abc").await.unwrap();
        store.delete(Namespace::Credentials, "1/abc").await.unwrap();
        assert!(!store.exists(Namespace::Credentials, "1/abc").await.unwrap());
    }

    #[tokio::test]
    async fn keys_are_sorted() {
        let (store, _dir) = open_test_store().await;
        for key in ["2/b", "1/a", "1/c"] {
            store.put(Namespace::Credentials, key, b"x").await.unwrap();
        }
        assert_eq!(
            store.keys(Namespace::Credentials).await.unwrap(),
            vec!["1/a", "1/c", "2/b"]
        );
    }
}
