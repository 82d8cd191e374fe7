//! Flat local key/value store
//!
//! The lesser-capability backend: a single JSON object mapping string keys
//! to string values, kept in memory and rewritten to disk on every change.
//! It hosts the fallback namespaces (one key prefix each) and the legacy
//! flat layout that predates namespaced storage.
//!
//! Keys keep their insertion order, on disk and in memory. Overwriting a key
//! keeps its position.
//!
//! Uses atomic writes (write to temp file, then rename) to prevent corruption.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::Mutex;
use tracing::debug;

use super::error::{StorageError, StorageResult};

/// Flat string key/value store shared by every handle cloned from it
#[derive(Debug, Clone)]
pub struct LocalStore {
    entries: Arc<Mutex<IndexMap<String, String>>>,
    /// Backing file, `None` for in-memory stores
    path: Option<Arc<PathBuf>>,
}

impl LocalStore {
    /// Create an empty store that is never written to disk
    pub fn in_memory() -> Self {
        Self {
            entries: Arc::new(Mutex::new(IndexMap::new())),
            path: None,
        }
    }

    /// Open a store backed by `path`
    ///
    /// A missing file is an empty store. A file that exists but is not a
    /// JSON object of strings is reported as corrupted.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();

        let entries = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| StorageError::ReadError {
                path: path.clone(),
                source,
            })?;
            if content.trim().is_empty() {
                IndexMap::new()
            } else {
                serde_json::from_str(&content).map_err(|e| StorageError::CorruptLocalStore {
                    path: path.clone(),
                    details: e.to_string(),
                })?
            }
        } else {
            IndexMap::new()
        };

        debug!("Opened local store {:?} with {} keys", path, entries.len());

        Ok(Self {
            entries: Arc::new(Mutex::new(entries)),
            path: Some(Arc::new(path)),
        })
    }

    /// Backing file path, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref().map(PathBuf::as_path)
    }

    /// Read a value
    pub async fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().await.get(key).cloned()
    }

    /// Write a value, persisting the whole store
    ///
    /// The in-memory state is restored if the write to disk fails.
    pub async fn set(&self, key: &str, value: impl Into<String>) -> StorageResult<()> {
        let mut entries = self.entries.lock().await;
        let previous = entries.insert(key.to_string(), value.into());

        if let Err(e) = self.persist(&entries) {
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.shift_remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Remove a value (no-op if absent)
    pub async fn remove(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock().await;
        let Some((index, _, previous)) = entries.shift_remove_full(key) else {
            return Ok(());
        };

        if let Err(e) = self.persist(&entries) {
            entries.shift_insert(index, key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }

    /// All keys, in insertion order
    pub async fn keys(&self) -> Vec<String> {
        self.entries.lock().await.keys().cloned().collect()
    }

    /// Keys that start with `prefix`, in insertion order
    pub async fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .lock()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Remove every key that starts with `prefix`
    pub async fn remove_prefix(&self, prefix: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock().await;
        let snapshot = entries.clone();
        entries.retain(|k, _| !k.starts_with(prefix));

        if entries.len() == snapshot.len() {
            return Ok(());
        }

        if let Err(e) = self.persist(&entries) {
            *entries = snapshot;
            return Err(e);
        }
        Ok(())
    }

    /// Remove everything
    pub async fn clear(&self) -> StorageResult<()> {
        self.remove_prefix("").await
    }

    fn persist(&self, entries: &IndexMap<String, String>) -> StorageResult<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        let json = serde_json::to_vec(entries)?;
        atomic_write(path, &json)
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|source| StorageError::AtomicWriteFailed {
        from: temp_path.clone(),
        to: path.to_path_buf(),
        source,
    })?;

    Ok(())
}
