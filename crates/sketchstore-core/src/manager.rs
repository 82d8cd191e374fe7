//! Storage manager facade
//!
//! The `StorageManager` is the single entry point collaborators use for
//! persistence. It is built once by an async factory that selects the
//! backend, then passed by reference to whoever needs it.
//!
//! ## Backend selection
//!
//! `open` tries SQLite first and probes every namespace with a
//! write/read/delete round trip. If opening or any probe fails, **all**
//! namespaces use the flat local store instead, so the manager never runs
//! with mixed backends.
//!
//! A local store file that cannot be read does not stop a healthy SQLite
//! backend: the manager opens on SQLite and reports the legacy layout as
//! unavailable. Opening fails only when neither backend is usable.
//!
//! ## Usage
//!
//! ```ignore
//! let manager = StorageManager::open(Config::load()?).await?;
//!
//! manager.save_file("Plan", &FileRecord::new("Plan")).await?;
//! let files = manager.get_all_files().await?; // newest first
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::models::{
    CacheEntry, FileRecord, NamespaceUsage, Snapshot, StoredDrawing, StoredFile, DRAWING_VERSION,
    SNAPSHOT_VERSION,
};
use crate::storage::{
    BackendKind, LocalStore, Namespace, NamespaceStore, SqliteBackend, StorageError,
    StorageResult,
};

/// Key prefix for files in `appData`
pub const FILE_PREFIX: &str = "file_";

/// Key prefix for drawings in `appData`
pub const DRAWING_PREFIX: &str = "drawing_";

/// Key prefix for entries in `cache`
pub const CACHE_PREFIX: &str = "cache_";

/// Lifetime of a cache entry: 24 hours
pub const CACHE_TTL_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// Namespaced storage facade
pub struct StorageManager {
    config: Config,
    backend: BackendKind,
    app_data: NamespaceStore,
    cache: NamespaceStore,
    settings: NamespaceStore,
    offline_queue: NamespaceStore,
    dead_letter: NamespaceStore,
    /// Flat store; fallback backend and home of the legacy layout
    local: LocalStore,
    /// False when the local store file could not be loaded
    local_available: bool,
    clock: Arc<dyn Clock>,
    /// Serializes migrations started from this manager
    migration_lock: Mutex<()>,
}

impl StorageManager {
    /// Open storage under `config.data_dir` using the wall clock
    pub async fn open(config: Config) -> StorageResult<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock)).await
    }

    /// Open storage under `config.data_dir` with a specific clock
    pub async fn open_with_clock(config: Config, clock: Arc<dyn Clock>) -> StorageResult<Self> {
        let (local, local_error) = match LocalStore::open(config.local_store_path()) {
            Ok(local) => (local, None),
            Err(e) => {
                warn!("StorageManager: local store unavailable: {}", e);
                (LocalStore::in_memory(), Some(e))
            }
        };

        let primary = if config.force_fallback {
            info!("StorageManager: fallback forced by configuration");
            None
        } else {
            match SqliteBackend::open(&config.sqlite_path()) {
                Ok(db) => Some(db),
                Err(e) => {
                    warn!("StorageManager: could not open SQLite database: {}", e);
                    None
                }
            }
        };

        let mut manager = Self::select_backend(config, primary, local, clock).await;
        if let Some(e) = local_error {
            if manager.backend == BackendKind::Fallback {
                return Err(e);
            }
            manager.local_available = false;
        }
        Ok(manager)
    }

    /// Fully in-memory storage (for testing)
    pub async fn in_memory(config: Config, clock: Arc<dyn Clock>) -> StorageResult<Self> {
        let primary = if config.force_fallback {
            None
        } else {
            Some(SqliteBackend::open_in_memory()?)
        };

        Ok(Self::select_backend(config, primary, LocalStore::in_memory(), clock).await)
    }

    /// Build a manager on top of already-opened backends
    ///
    /// The primary backend, if given, is probed across every namespace.
    pub async fn with_backends(
        config: Config,
        primary: Option<SqliteBackend>,
        local: LocalStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::select_backend(config, primary, local, clock).await
    }

    async fn select_backend(
        config: Config,
        primary: Option<SqliteBackend>,
        local: LocalStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        if let Some(db) = primary {
            let stores = Namespace::ALL.map(|ns| NamespaceStore::primary(ns, db.clone()));

            match probe_all(&stores, clock.now_millis()).await {
                Ok(()) => {
                    info!("StorageManager: using SQLite as primary backend");
                    return Self::from_stores(config, BackendKind::Primary, stores, local, clock);
                }
                Err(e) => warn!("StorageManager: {}", e),
            }
        }

        warn!("StorageManager: falling back to local store");
        let stores = Namespace::ALL.map(|ns| NamespaceStore::fallback(ns, local.clone()));
        Self::from_stores(config, BackendKind::Fallback, stores, local, clock)
    }

    fn from_stores(
        config: Config,
        backend: BackendKind,
        stores: [NamespaceStore; 5],
        local: LocalStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let [app_data, cache, settings, offline_queue, dead_letter] = stores;
        Self {
            config,
            backend,
            app_data,
            cache,
            settings,
            offline_queue,
            dead_letter,
            local,
            local_available: true,
            clock,
            migration_lock: Mutex::new(()),
        }
    }

    /// The backend chosen at construction
    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The flat local store (holds the legacy layout)
    pub fn local_store(&self) -> &LocalStore {
        &self.local
    }

    /// Whether the local store file was loaded
    ///
    /// When it was not, the manager runs on SQLite and the legacy layout
    /// cannot be read or written.
    pub fn local_store_available(&self) -> bool {
        self.local_available
    }

    /// Direct access to one namespace
    pub fn store(&self, namespace: Namespace) -> &NamespaceStore {
        match namespace {
            Namespace::AppData => &self.app_data,
            Namespace::Cache => &self.cache,
            Namespace::Settings => &self.settings,
            Namespace::OfflineQueue => &self.offline_queue,
            Namespace::DeadLetter => &self.dead_letter,
        }
    }

    pub(crate) fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub(crate) fn migration_lock(&self) -> &Mutex<()> {
        &self.migration_lock
    }

    // ==================== File Operations ====================

    /// Save a file under its name, overwriting any file with the same name
    pub async fn save_file(&self, name: &str, data: &FileRecord) -> StorageResult<StoredFile> {
        let size = serde_json::to_string(data)?.len();
        let stored = StoredFile {
            name: name.to_string(),
            data: data.clone(),
            timestamp: self.now_millis(),
            size,
        };

        self.app_data
            .set_item(&file_key(name), &serde_json::to_value(&stored)?)
            .await?;
        info!(
            "StorageManager: file {} saved ({:.2}KB)",
            name,
            size as f64 / 1024.0
        );
        Ok(stored)
    }

    /// Get a file by name
    pub async fn get_file(&self, name: &str) -> StorageResult<Option<StoredFile>> {
        load_record(&self.app_data, &file_key(name)).await
    }

    /// All files, most recently saved first
    ///
    /// Files saved in the same millisecond keep the order they were first
    /// saved in. Records that cannot be decoded are skipped.
    pub async fn get_all_files(&self) -> StorageResult<Vec<StoredFile>> {
        let mut files: Vec<StoredFile> = load_prefixed(&self.app_data, FILE_PREFIX).await?;
        files.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(files)
    }

    /// Delete a file by name
    pub async fn delete_file(&self, name: &str) -> StorageResult<()> {
        self.app_data.remove_item(&file_key(name)).await?;
        info!("StorageManager: file {} deleted", name);
        Ok(())
    }

    // ==================== Drawing Operations ====================

    /// Save raw drawing data under `drawing_<id>`
    pub async fn save_drawing(&self, id: &str, data: Value) -> StorageResult<StoredDrawing> {
        let stored = StoredDrawing {
            id: id.to_string(),
            data,
            timestamp: self.now_millis(),
            version: DRAWING_VERSION.to_string(),
        };

        self.app_data
            .set_item(&drawing_key(id), &serde_json::to_value(&stored)?)
            .await?;
        info!("StorageManager: drawing {} saved", id);
        Ok(stored)
    }

    /// Get a drawing by id
    pub async fn get_drawing(&self, id: &str) -> StorageResult<Option<StoredDrawing>> {
        load_record(&self.app_data, &drawing_key(id)).await
    }

    /// All drawings, most recently saved first
    pub async fn get_all_drawings(&self) -> StorageResult<Vec<StoredDrawing>> {
        let mut drawings: Vec<StoredDrawing> =
            load_prefixed(&self.app_data, DRAWING_PREFIX).await?;
        drawings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(drawings)
    }

    /// Delete a drawing by id
    pub async fn delete_drawing(&self, id: &str) -> StorageResult<()> {
        self.app_data.remove_item(&drawing_key(id)).await?;
        info!("StorageManager: drawing {} deleted", id);
        Ok(())
    }

    // ==================== Settings ====================

    /// Store a setting
    pub async fn save_setting<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        self.settings
            .set_item(key, &serde_json::to_value(value)?)
            .await
    }

    /// Read a setting, returning `default` when it is absent
    ///
    /// A present value that does not decode as `T` is an error.
    pub async fn get_setting<T: DeserializeOwned>(&self, key: &str, default: T) -> StorageResult<T> {
        Ok(load_record(&self.settings, key).await?.unwrap_or(default))
    }

    /// Read a setting as raw JSON
    pub async fn get_setting_value(&self, key: &str) -> StorageResult<Option<Value>> {
        self.settings.get_item(key).await
    }

    // ==================== Cache ====================

    /// Cache `data` for `url` for 24 hours
    pub async fn cache_resource(&self, url: &str, data: Value) -> StorageResult<()> {
        let now = self.now_millis();
        let entry = CacheEntry {
            url: url.to_string(),
            data,
            timestamp: now,
            expires_at: now + CACHE_TTL_MILLIS,
        };

        self.cache
            .set_item(&cache_key(url), &serde_json::to_value(&entry)?)
            .await
    }

    /// Cached data for `url`, if present and fresh
    ///
    /// An expired entry is deleted by the read that finds it.
    pub async fn get_cached_resource(&self, url: &str) -> StorageResult<Option<Value>> {
        let key = cache_key(url);
        let Some(entry) = load_record::<CacheEntry>(&self.cache, &key).await? else {
            return Ok(None);
        };

        if entry.is_expired(self.now_millis()) {
            debug!("StorageManager: evicting expired cache entry for {}", url);
            self.cache.remove_item(&key).await?;
            return Ok(None);
        }

        Ok(Some(entry.data))
    }

    // ==================== Utilities ====================

    /// Item count and serialized size for every namespace
    ///
    /// Reads every record; intended for diagnostics only.
    pub async fn get_storage_usage(&self) -> StorageResult<BTreeMap<Namespace, NamespaceUsage>> {
        let mut usage = BTreeMap::new();

        for ns in Namespace::ALL {
            let store = self.store(ns);
            let keys = store.keys().await?;
            let mut size_bytes = 0;

            for key in &keys {
                match store.get_item(key).await {
                    Ok(Some(value)) => size_bytes += serde_json::to_string(&value)?.len(),
                    Ok(None) => {}
                    Err(e) if e.is_decode() => warn!("StorageManager: {}", e),
                    Err(e) => return Err(e),
                }
            }

            usage.insert(
                ns,
                NamespaceUsage {
                    item_count: keys.len(),
                    size_bytes,
                },
            );
        }

        Ok(usage)
    }

    /// Clear every namespace. Irreversible.
    pub async fn clear_all_data(&self) -> StorageResult<()> {
        for ns in Namespace::ALL {
            self.store(ns).clear().await?;
            info!("StorageManager: cleared {} storage", ns);
        }
        Ok(())
    }

    /// Export every namespace
    ///
    /// Records that cannot be decoded are left out.
    pub async fn export_data(&self) -> StorageResult<Snapshot> {
        let mut data = Map::new();

        for ns in Namespace::ALL {
            let store = self.store(ns);
            let mut records = Map::new();

            for key in store.keys().await? {
                match store.get_item(&key).await {
                    Ok(Some(value)) => {
                        records.insert(key, value);
                    }
                    Ok(None) => {}
                    Err(e) if e.is_decode() => warn!("StorageManager: skipping export of {}", e),
                    Err(e) => return Err(e),
                }
            }

            data.insert(ns.as_str().to_string(), Value::Object(records));
        }

        Ok(Snapshot {
            timestamp: self.now_millis(),
            version: SNAPSHOT_VERSION.to_string(),
            data,
        })
    }

    /// Merge a snapshot into storage
    ///
    /// Keys present in the snapshot overwrite existing ones; nothing else
    /// is touched. Unknown namespaces, and namespaces whose value is not an
    /// object, are ignored. Returns the number of records written.
    pub async fn import_data(&self, snapshot: &Snapshot) -> StorageResult<usize> {
        let mut written = 0;

        for (name, records) in &snapshot.data {
            let Some(ns) = Namespace::from_name(name) else {
                warn!("StorageManager: ignoring unknown namespace '{}' in import", name);
                continue;
            };
            let Some(records) = records.as_object() else {
                warn!("StorageManager: ignoring namespace '{}' in import, not an object", name);
                continue;
            };

            let store = self.store(ns);
            for (key, value) in records {
                store.set_item(key, value).await?;
                written += 1;
            }
        }

        info!("StorageManager: imported {} records", written);
        Ok(written)
    }
}

/// Probe every store, stopping at the first failure
async fn probe_all(stores: &[NamespaceStore], timestamp: i64) -> StorageResult<()> {
    for store in stores {
        store.probe(timestamp).await?;
        debug!("StorageManager: {} storage test passed", store.namespace());
    }
    Ok(())
}

/// Load and decode a single record
pub(crate) async fn load_record<T: DeserializeOwned>(
    store: &NamespaceStore,
    key: &str,
) -> StorageResult<Option<T>> {
    match store.get_item(key).await? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| StorageError::decode(store.namespace(), key, e)),
        None => Ok(None),
    }
}

/// Load every decodable record whose key starts with `prefix`
///
/// Results follow the store's key order. Corrupt records are logged and
/// skipped; any other error aborts.
pub(crate) async fn load_prefixed<T: DeserializeOwned>(
    store: &NamespaceStore,
    prefix: &str,
) -> StorageResult<Vec<T>> {
    let mut records = Vec::new();

    for key in store.keys().await? {
        if !key.starts_with(prefix) {
            continue;
        }
        match load_record(store, &key).await {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) if e.is_decode() => warn!("StorageManager: skipping {}", e),
            Err(e) => return Err(e),
        }
    }

    Ok(records)
}

fn file_key(name: &str) -> String {
    format!("{}{}", FILE_PREFIX, name)
}

fn drawing_key(id: &str) -> String {
    format!("{}{}", DRAWING_PREFIX, id)
}

fn cache_key(url: &str) -> String {
    format!("{}{}", CACHE_PREFIX, BASE64.encode(url))
}
