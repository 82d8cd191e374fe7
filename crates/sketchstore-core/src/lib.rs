//! SketchStore Core Library
//!
//! This crate provides namespaced local-first storage for a drawing
//! application: files, drawings, settings, a resource cache and an offline
//! operation queue, plus migration from the older flat layout.
//!
//! # Architecture
//!
//! - **SQLite**: primary backend, one table per namespace
//! - **Local store**: flat JSON key/value file, used when SQLite is
//!   unavailable and holding the legacy layout
//!
//! The backend is chosen once, when the manager is opened.
//!
//! # Quick Start
//!
//! ```text
//! let manager = StorageManager::open(Config::load()?).await?;
//! MigrationService::new(&manager).check_and_migrate().await?;
//!
//! // Save a file
//! manager.save_file("Plan", &FileRecord::new("Plan")).await?;
//!
//! // Query files, newest first
//! let files = manager.get_all_files().await?;
//! ```
//!
//! # Modules
//!
//! - `manager`: Storage facade (main entry point)
//! - `queue`: Offline operation queue, dead letters and replay
//! - `migration`: Legacy layout migration and rollback
//! - `models`: Persisted records
//! - `storage`: Backends and namespaces
//! - `clock`: Time source
//! - `config`: Application configuration

pub mod clock;
pub mod config;
pub mod manager;
pub mod migration;
pub mod models;
pub mod queue;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use manager::StorageManager;
pub use migration::{
    MigrationOutcome, MigrationReport, MigrationService, RollbackReport, StepReport, StepStatus,
    StorageStats,
};
pub use models::{
    CacheEntry, FileRecord, KnownOperation, NamespaceUsage, OfflineOperation, QueueEntry,
    Snapshot, StoredDrawing, StoredFile,
};
pub use queue::{
    replay_offline_queue, LoggingReplayHandler, QueueDisposition, ReplayHandler, ReplaySummary,
};
pub use storage::{BackendKind, Namespace, StorageError, StorageResult};
