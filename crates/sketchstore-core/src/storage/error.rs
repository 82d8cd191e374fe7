//! Storage error handling
//!
//! Provides typed errors for storage operations with descriptive messages
//! and recovery suggestions.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use super::namespace::Namespace;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to create data directory
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Permission denied accessing path
    #[error("Permission denied: cannot access '{path}'. Check file permissions.")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Disk is full or quota exceeded
    #[error(
        "Disk full or quota exceeded while writing to '{path}'. Free up disk space and try again."
    )]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read file
    #[error("Failed to read '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write file
    #[error("Failed to write '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The flat local store file cannot be parsed
    #[error("Local store at '{path}' is corrupted: {details}")]
    CorruptLocalStore { path: PathBuf, details: String },

    /// The local store was not loaded at startup, so the legacy layout is out of reach
    #[error("Local store at '{path}' could not be loaded; legacy data is unavailable")]
    LocalStoreUnavailable { path: PathBuf },

    /// A stored record is not valid JSON or does not have the expected shape
    #[error("Record '{key}' in namespace '{namespace}' could not be decoded: {source}")]
    Decode {
        namespace: Namespace,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A backend failed the write/read/delete round trip
    #[error("Storage probe failed for namespace '{namespace}': {details}")]
    Probe { namespace: Namespace, details: String },

    /// Import payload is not a snapshot
    #[error("Invalid import data format: {0}")]
    InvalidSnapshot(String),

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON encoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Atomic write failed during rename
    #[error("Atomic write failed: could not rename '{from}' to '{to}': {source}")]
    AtomicWriteFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    /// Create an error from an I/O error with path context
    ///
    /// Classifies the error based on its kind (permission, disk full, etc.)
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => StorageError::PermissionDenied {
                path,
                source: error,
            },
            _ if is_disk_full_error(&error) => StorageError::DiskFull {
                path,
                source: error,
            },
            _ => StorageError::WriteError {
                path,
                source: error,
            },
        }
    }

    /// Build a decode error for a record
    pub fn decode(namespace: Namespace, key: impl Into<String>, source: serde_json::Error) -> Self {
        StorageError::Decode {
            namespace,
            key: key.into(),
            source,
        }
    }

    /// Whether this error concerns a single unreadable record
    ///
    /// Bulk enumerations skip such records instead of failing.
    pub fn is_decode(&self) -> bool {
        matches!(self, StorageError::Decode { .. })
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::DiskFull { .. } => Some("Free up disk space and try again."),
            StorageError::PermissionDenied { .. } => {
                Some("Check file and directory permissions. You may need to run with different permissions or change ownership.")
            }
            StorageError::CorruptLocalStore { .. } | StorageError::LocalStoreUnavailable { .. } => {
                Some("Move the corrupted file aside to start with an empty local store, or repair the JSON by hand.")
            }
            StorageError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            StorageError::InvalidSnapshot(_) => {
                Some("Import expects a file produced by `sketchstore export`.")
            }
            _ => None,
        }
    }
}

/// Check if an I/O error indicates disk full condition
fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_classification() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err = StorageError::from_io(io_err, PathBuf::from("/test/path"));

        assert!(matches!(err, StorageError::PermissionDenied { .. }));
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_disk_full_detection() {
        let io_err = io::Error::new(io::ErrorKind::Other, "No space left on device");
        let err = StorageError::from_io(io_err, PathBuf::from("/full/disk"));

        assert!(matches!(err, StorageError::DiskFull { .. }));
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_decode_error_is_flagged() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = StorageError::decode(Namespace::AppData, "file_broken", source);

        assert!(err.is_decode());
        let msg = err.to_string();
        assert!(msg.contains("file_broken"));
        assert!(msg.contains("appData"));
    }

    #[test]
    fn test_probe_error_display() {
        let err = StorageError::Probe {
            namespace: Namespace::OfflineQueue,
            details: "read back mismatch".to_string(),
        };

        assert!(!err.is_decode());
        assert!(err.to_string().contains("offlineQueue"));
    }
}
