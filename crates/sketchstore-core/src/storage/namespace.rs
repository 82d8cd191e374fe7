//! Namespaces and the per-namespace store
//!
//! Every namespace is an independent key space on the selected backend:
//! a table in SQLite ([`BackendKind::Primary`]) or a key prefix in the
//! flat local store ([`BackendKind::Fallback`]). Values are JSON.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::error::{StorageError, StorageResult};
use super::local::LocalStore;
use super::sqlite::SqliteBackend;

/// Key written and removed by the capability probe
pub const PROBE_KEY: &str = "_storage_test";

/// A logical key-value partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Namespace {
    /// Files and drawings
    AppData,
    /// Cached resources with a fixed TTL
    Cache,
    /// User preferences and bookkeeping flags
    Settings,
    /// Operations recorded while offline, awaiting replay
    OfflineQueue,
    /// Queue entries that exceeded the retry ceiling
    DeadLetter,
}

impl Namespace {
    /// Every namespace, in a fixed order
    pub const ALL: [Namespace; 5] = [
        Namespace::AppData,
        Namespace::Cache,
        Namespace::Settings,
        Namespace::OfflineQueue,
        Namespace::DeadLetter,
    ];

    /// Name used in snapshots and usage reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::AppData => "appData",
            Namespace::Cache => "cache",
            Namespace::Settings => "settings",
            Namespace::OfflineQueue => "offlineQueue",
            Namespace::DeadLetter => "deadLetter",
        }
    }

    /// Parse a snapshot namespace name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ns| ns.as_str() == name)
    }

    /// SQLite table holding this namespace
    pub fn table_name(&self) -> &'static str {
        match self {
            Namespace::AppData => "app_data",
            Namespace::Cache => "cache",
            Namespace::Settings => "settings",
            Namespace::OfflineQueue => "offline_queue",
            Namespace::DeadLetter => "dead_letter",
        }
    }

    /// Key prefix in the flat local store
    pub fn local_prefix(&self) -> &'static str {
        match self {
            Namespace::AppData => "sketchstore_app_",
            Namespace::Cache => "sketchstore_cache_",
            Namespace::Settings => "sketchstore_settings_",
            Namespace::OfflineQueue => "sketchstore_queue_",
            Namespace::DeadLetter => "sketchstore_deadletter_",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which backend the manager settled on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// SQLite database
    Primary,
    /// Flat local store
    Fallback,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Primary => f.write_str("sqlite"),
            BackendKind::Fallback => f.write_str("local store (fallback)"),
        }
    }
}

#[derive(Clone)]
enum Backend {
    Primary(SqliteBackend),
    Fallback(LocalStore),
}

/// Async key-value access to one namespace
#[derive(Clone)]
pub struct NamespaceStore {
    namespace: Namespace,
    backend: Backend,
}

impl NamespaceStore {
    /// Store backed by SQLite
    pub fn primary(namespace: Namespace, backend: SqliteBackend) -> Self {
        Self {
            namespace,
            backend: Backend::Primary(backend),
        }
    }

    /// Store backed by a prefix of the flat local store
    pub fn fallback(namespace: Namespace, store: LocalStore) -> Self {
        Self {
            namespace,
            backend: Backend::Fallback(store),
        }
    }

    /// The namespace this store addresses
    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// The backend this store runs on
    pub fn kind(&self) -> BackendKind {
        match self.backend {
            Backend::Primary(_) => BackendKind::Primary,
            Backend::Fallback(_) => BackendKind::Fallback,
        }
    }

    /// Store a JSON value under `key`
    pub async fn set_item(&self, key: &str, value: &Value) -> StorageResult<()> {
        let text = serde_json::to_string(value)?;
        match &self.backend {
            Backend::Primary(db) => db.set(self.namespace, key, &text).await,
            Backend::Fallback(local) => local.set(&self.local_key(key), text).await,
        }
    }

    /// Load the JSON value under `key`
    ///
    /// Absence is `Ok(None)`; text that is not JSON is a decode error.
    pub async fn get_item(&self, key: &str) -> StorageResult<Option<Value>> {
        let text = match &self.backend {
            Backend::Primary(db) => db.get(self.namespace, key).await?,
            Backend::Fallback(local) => local.get(&self.local_key(key)).await,
        };

        match text {
            Some(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| StorageError::decode(self.namespace, key, e)),
            None => Ok(None),
        }
    }

    /// Delete `key` (no-op if absent)
    pub async fn remove_item(&self, key: &str) -> StorageResult<()> {
        match &self.backend {
            Backend::Primary(db) => db.remove(self.namespace, key).await,
            Backend::Fallback(local) => local.remove(&self.local_key(key)).await,
        }
    }

    /// Delete every key in the namespace
    pub async fn clear(&self) -> StorageResult<()> {
        match &self.backend {
            Backend::Primary(db) => db.clear(self.namespace).await,
            Backend::Fallback(local) => local.remove_prefix(self.namespace.local_prefix()).await,
        }
    }

    /// Keys in the namespace, in insertion order
    ///
    /// Both backends keep a key's position when it is overwritten.
    pub async fn keys(&self) -> StorageResult<Vec<String>> {
        match &self.backend {
            Backend::Primary(db) => db.keys(self.namespace).await,
            Backend::Fallback(local) => {
                let prefix = self.namespace.local_prefix();
                Ok(local
                    .keys_with_prefix(prefix)
                    .await
                    .into_iter()
                    .map(|k| k[prefix.len()..].to_string())
                    .collect())
            }
        }
    }

    /// Round-trip a marker record through the backend
    pub async fn probe(&self, timestamp: i64) -> StorageResult<()> {
        let marker = json!({ "test": true, "timestamp": timestamp });
        self.set_item(PROBE_KEY, &marker).await?;

        let retrieved = self.get_item(PROBE_KEY).await?;
        let passed = retrieved
            .as_ref()
            .and_then(|v| v.get("test"))
            .and_then(Value::as_bool)
            == Some(true);

        if !passed {
            return Err(StorageError::Probe {
                namespace: self.namespace,
                details: format!("read back {:?}", retrieved),
            });
        }

        self.remove_item(PROBE_KEY).await
    }

    fn local_key(&self, key: &str) -> String {
        format!("{}{}", self.namespace.local_prefix(), key)
    }
}
