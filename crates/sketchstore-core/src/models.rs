//! Data models for SketchStore
//!
//! Records persisted through the storage manager. Every record is stored as
//! JSON; field names follow the camelCase layout the application already
//! writes, so snapshots and legacy data stay readable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::storage::{StorageError, StorageResult};

/// Snapshot format version written by export
pub const SNAPSHOT_VERSION: &str = "1.0";

/// Drawing record format version
pub const DRAWING_VERSION: &str = "1.0";

/// A drawing file as the editor sees it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Unique identifier
    pub id: String,
    /// Display name; also the storage address of the file
    pub name: String,
    /// Drawing elements, opaque to storage
    #[serde(default)]
    pub elements: Vec<Value>,
    /// Editor state, opaque to storage
    #[serde(default = "empty_object")]
    pub app_state: Value,
    /// When this file was created
    pub created_at: DateTime<Utc>,
    /// When this file was last updated
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    /// Create an empty file with the given name
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            elements: Vec::new(),
            app_state: empty_object(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the elements
    pub fn set_elements(&mut self, elements: Vec<Value>) {
        self.elements = elements;
        self.updated_at = Utc::now();
    }

    /// Build a file from an entry written by an older client
    ///
    /// Only `name` is required. Numeric ids become strings, a missing id is
    /// generated, and missing or unparseable dates are set to `now`.
    pub fn from_loose(entry: &Value, now: DateTime<Utc>) -> Option<Self> {
        let name = entry.get("name")?.as_str()?.to_string();

        let id = loose_id(entry.get("id")).unwrap_or_else(|| Uuid::new_v4().to_string());

        Some(Self {
            id,
            name,
            elements: entry
                .get("elements")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            app_state: entry
                .get("appState")
                .filter(|v| v.is_object())
                .cloned()
                .unwrap_or_else(empty_object),
            created_at: parse_date(entry.get("createdAt")).unwrap_or(now),
            updated_at: parse_date(entry.get("updatedAt")).unwrap_or(now),
        })
    }
}

/// A file as persisted under `file_<name>`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredFile {
    /// Storage name
    pub name: String,
    /// The file itself
    pub data: FileRecord,
    /// Save time (epoch millis)
    pub timestamp: i64,
    /// Serialized size of `data` in bytes
    pub size: usize,
}

/// A drawing persisted under `drawing_<id>`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredDrawing {
    pub id: String,
    pub data: Value,
    /// Save time (epoch millis)
    pub timestamp: i64,
    pub version: String,
}

/// A cached resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub url: String,
    pub data: Value,
    /// Write time (epoch millis)
    pub timestamp: i64,
    /// First instant (epoch millis) at which the entry is stale
    pub expires_at: i64,
}

impl CacheEntry {
    /// Whether the entry must no longer be served at `now`
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

/// Operation kinds the replay loop understands
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum KnownOperation {
    /// A file was saved while offline
    Save {
        #[serde(rename = "fileId", default, skip_serializing_if = "Option::is_none")]
        file_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
        data: FileRecord,
    },
    /// A file was deleted while offline
    Delete {
        #[serde(rename = "fileId")]
        file_id: String,
        #[serde(rename = "fileName", default, skip_serializing_if = "Option::is_none")]
        file_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
}

impl KnownOperation {
    /// Decode a `save` or `delete` written by an older client
    ///
    /// File fields are filled in as [`FileRecord::from_loose`] does. The
    /// error names what is missing.
    pub fn from_loose(value: &Value, now: DateTime<Utc>) -> Result<Self, String> {
        let file_id = loose_id(value.get("fileId"));
        let timestamp = value
            .get("timestamp")
            .and_then(Value::as_str)
            .map(str::to_string);

        match value.get("type").and_then(Value::as_str) {
            Some("save") => {
                let data = value
                    .get("data")
                    .and_then(|data| FileRecord::from_loose(data, now))
                    .ok_or_else(|| "save operation has no named file data".to_string())?;
                Ok(KnownOperation::Save {
                    file_id,
                    timestamp,
                    data,
                })
            }
            Some("delete") => Ok(KnownOperation::Delete {
                file_id: file_id.ok_or_else(|| "delete operation has no fileId".to_string())?,
                file_name: value
                    .get("fileName")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                timestamp,
            }),
            other => Err(format!("not a save or delete operation: {:?}", other)),
        }
    }
}

/// An operation recorded in the offline queue
///
/// Anything that does not decode as a well-formed `save`/`delete` is kept
/// verbatim as [`OfflineOperation::Other`], so newer operation kinds and
/// older partial payloads both survive storage. [`OfflineOperation::resolve`]
/// dispatches on the `type` tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum OfflineOperation {
    Known(KnownOperation),
    Other(Value),
}

impl OfflineOperation {
    /// A save of `data`
    pub fn save(data: FileRecord) -> Self {
        OfflineOperation::Known(KnownOperation::Save {
            file_id: Some(data.id.clone()),
            timestamp: Some(Utc::now().to_rfc3339()),
            data,
        })
    }

    /// A delete of the file `file_id`
    pub fn delete(file_id: impl Into<String>, file_name: Option<String>) -> Self {
        OfflineOperation::Known(KnownOperation::Delete {
            file_id: file_id.into(),
            file_name,
            timestamp: Some(Utc::now().to_rfc3339()),
        })
    }

    /// The operation replay should apply
    ///
    /// `Ok(None)` for kinds replay does not handle. A `save` or `delete`
    /// that cannot be completed from its payload is an error, never `None`.
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<Option<KnownOperation>, String> {
        match self {
            OfflineOperation::Known(operation) => Ok(Some(operation.clone())),
            OfflineOperation::Other(raw) => match self.kind() {
                "save" | "delete" => KnownOperation::from_loose(raw, now).map(Some),
                _ => Ok(None),
            },
        }
    }

    /// Replace a loose `save`/`delete` with its decoded form
    ///
    /// Anything else, including payloads that cannot be completed, is
    /// returned unchanged.
    pub fn normalized(self, now: DateTime<Utc>) -> Self {
        match self.resolve(now) {
            Ok(Some(operation)) => OfflineOperation::Known(operation),
            _ => self,
        }
    }

    /// The `type` tag, or `"unknown"` if there is none
    pub fn kind(&self) -> &str {
        match self {
            OfflineOperation::Known(KnownOperation::Save { .. }) => "save",
            OfflineOperation::Known(KnownOperation::Delete { .. }) => "delete",
            OfflineOperation::Other(value) => value
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown"),
        }
    }
}

/// A pending operation in the offline queue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    /// `queue_<millis>_<random>`; also the storage key
    pub id: String,
    pub operation: OfflineOperation,
    /// Enqueue time (epoch millis); replay order
    pub timestamp: i64,
    /// Failed replay attempts so far
    pub retries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Item count and serialized size of one namespace
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceUsage {
    pub item_count: usize,
    pub size_bytes: usize,
}

impl NamespaceUsage {
    /// Size in megabytes with two decimals
    pub fn size_mb(&self) -> String {
        format!("{:.2}", self.size_bytes as f64 / 1024.0 / 1024.0)
    }
}

/// Full export of every namespace
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    /// Export time (epoch millis)
    pub timestamp: i64,
    pub version: String,
    /// Namespace name -> key -> record
    ///
    /// Kept loose so snapshots from newer versions still parse; import
    /// skips entries that are not objects of records.
    pub data: Map<String, Value>,
}

impl Snapshot {
    /// Parse an exported snapshot
    pub fn from_json(json: &str) -> StorageResult<Self> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| StorageError::InvalidSnapshot(e.to_string()))?;

        if !value.get("data").is_some_and(Value::is_object) {
            return Err(StorageError::InvalidSnapshot(
                "missing `data` object".to_string(),
            ));
        }

        serde_json::from_value(value).map_err(|e| StorageError::InvalidSnapshot(e.to_string()))
    }

    /// Number of records across all namespaces
    pub fn record_count(&self) -> usize {
        self.data
            .values()
            .filter_map(Value::as_object)
            .map(Map::len)
            .sum()
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// A string id, or a numeric one as its decimal text
fn loose_id(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn parse_date(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let text = value?.as_str()?;
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}
