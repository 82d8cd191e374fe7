//! Storage layer
//!
//! Backends and the per-namespace key-value interface built on them.
//!
//! ## Architecture
//!
//! - **SQLite** (primary): one database file, one table per namespace
//! - **Local store** (fallback): flat JSON key/value file, one key prefix
//!   per namespace; also holds the legacy pre-namespace layout
//!
//! The backend is chosen once when the manager is opened. If the primary
//! backend fails its probe for any namespace, every namespace falls back.

pub mod error;
pub mod local;
pub mod namespace;
pub mod schema;
pub mod sqlite;

pub use error::{StorageError, StorageResult};
pub use local::LocalStore;
pub use namespace::{BackendKind, Namespace, NamespaceStore};
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
pub use sqlite::SqliteBackend;
