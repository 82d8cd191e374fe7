//! SQLite primary backend
//!
//! The higher-capacity backend. A single database file holds one table per
//! namespace (see [`schema`](super::schema)). The connection is shared
//! behind an async mutex; each call is a single statement, so every
//! operation is atomic with respect to the key it touches.

use std::path::Path;
use std::sync::Arc;

use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;

use super::error::{StorageError, StorageResult};
use super::namespace::Namespace;
use super::schema::{init_schema, needs_init};

/// Handle to the SQLite database
#[derive(Clone)]
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    /// Open or create the SQLite database at `path`
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        if needs_init(&conn)? {
            init_schema(&conn)?;
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert or replace a value, keeping the original row position
    pub async fn set(&self, namespace: Namespace, key: &str, value: &str) -> StorageResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            &format!(
                "INSERT INTO {} (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                namespace.table_name()
            ),
            params![key, value],
        )?;
        Ok(())
    }

    /// Read a value
    pub async fn get(&self, namespace: Namespace, key: &str) -> StorageResult<Option<String>> {
        let conn = self.conn.lock().await;
        let value = conn
            .query_row(
                &format!("SELECT value FROM {} WHERE key = ?1", namespace.table_name()),
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Delete a value (no-op if absent)
    pub async fn remove(&self, namespace: Namespace, key: &str) -> StorageResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            &format!("DELETE FROM {} WHERE key = ?1", namespace.table_name()),
            params![key],
        )?;
        Ok(())
    }

    /// Delete every value in a namespace
    pub async fn clear(&self, namespace: Namespace) -> StorageResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(&format!("DELETE FROM {}", namespace.table_name()), [])?;
        Ok(())
    }

    /// Keys of a namespace, in insertion order
    pub async fn keys(&self, namespace: Namespace) -> StorageResult<Vec<String>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT key FROM {} ORDER BY rowid",
            namespace.table_name()
        ))?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_set_get_remove() {
        let backend = SqliteBackend::open_in_memory().unwrap();

        backend.set(Namespace::Settings, "theme", "\"dark\"").await.unwrap();
        assert_eq!(
            backend.get(Namespace::Settings, "theme").await.unwrap().as_deref(),
            Some("\"dark\"")
        );

        backend.remove(Namespace::Settings, "theme").await.unwrap();
        assert!(backend.get(Namespace::Settings, "theme").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_namespaces_are_disjoint() {
        let backend = SqliteBackend::open_in_memory().unwrap();

        backend.set(Namespace::AppData, "k", "1").await.unwrap();
        backend.set(Namespace::Cache, "k", "2").await.unwrap();

        assert_eq!(
            backend.get(Namespace::AppData, "k").await.unwrap().as_deref(),
            Some("1")
        );
        backend.clear(Namespace::Cache).await.unwrap();
        assert!(backend.get(Namespace::Cache, "k").await.unwrap().is_none());
        assert!(backend.get(Namespace::AppData, "k").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_keys_keep_insertion_order_across_updates() {
        let backend = SqliteBackend::open_in_memory().unwrap();

        backend.set(Namespace::AppData, "b", "1").await.unwrap();
        backend.set(Namespace::AppData, "a", "1").await.unwrap();
        backend.set(Namespace::AppData, "b", "2").await.unwrap();

        assert_eq!(
            backend.keys(Namespace::AppData).await.unwrap(),
            vec!["b".to_string(), "a".to_string()]
        );
    }

    #[tokio::test]
    async fn test_data_persists_across_reopens() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("storage.db");

        {
            let backend = SqliteBackend::open(&path).unwrap();
            backend.set(Namespace::OfflineQueue, "q1", "{}").await.unwrap();
        }

        let backend = SqliteBackend::open(&path).unwrap();
        assert_eq!(
            backend.keys(Namespace::OfflineQueue).await.unwrap(),
            vec!["q1".to_string()]
        );
    }

    #[test]
    fn test_open_rejects_non_database_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("storage.db");
        std::fs::write(&path, b"this is definitely not an sqlite database file").unwrap();

        assert!(SqliteBackend::open(&path).is_err());
    }
}
