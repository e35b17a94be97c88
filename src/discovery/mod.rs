//! Asset discovery
//!
//! Source-specific adapters enumerate remote storage into flat lists of
//! [`AssetDescriptor`]s. Adapters never mutate the remote source or the
//! catalog; merging the result into the catalog is the reconciliation
//! engine's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub mod file_share;
pub mod filesystem;
pub mod object_store;
pub mod queue_service;
pub mod registry;
pub mod source;
pub mod table_service;
pub mod trait_;

pub use registry::AdapterRegistry;
pub use trait_::DiscoveryAdapter;

/// Errors that abort a whole discovery call for one connector.
///
/// Container-level failures are not represented here; they are recorded in
/// [`Discovery::failures`] and the rest of the batch proceeds.
#[derive(Debug, Clone, Error)]
pub enum DiscoveryError {
    /// Missing or ambiguous credentials/scope. Never retried automatically.
    #[error("configuration error: {details}")]
    Configuration { details: String },
    /// Network or auth failure against the source. Retried on the next
    /// scheduled tick.
    #[error("remote source unavailable: {details}")]
    RemoteUnavailable { details: String },
}

impl DiscoveryError {
    pub fn configuration<S: Into<String>>(details: S) -> Self {
        Self::Configuration {
            details: details.into(),
        }
    }

    pub fn remote_unavailable<S: Into<String>>(details: S) -> Self {
        Self::RemoteUnavailable {
            details: details.into(),
        }
    }
}

/// Classified kind of a discovered object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Folder,
    File,
    DataFile,
    Script,
    TextFile,
    Archive,
    Table,
    Queue,
}

const DATA_FILE_EXTENSIONS: &[&str] = &[".csv", ".tsv", ".json", ".parquet", ".avro", ".orc"];
const SCRIPT_EXTENSIONS: &[&str] = &[".sql", ".py", ".scala", ".r"];
const TEXT_FILE_EXTENSIONS: &[&str] = &[".txt", ".log"];
const ARCHIVE_EXTENSIONS: &[&str] = &[".zip", ".gz", ".tar", ".bz2"];

impl AssetKind {
    /// Classify an object key by extension group. Keys with a trailing slash
    /// are folder markers.
    pub fn classify(key: &str) -> Self {
        if key.ends_with('/') {
            return AssetKind::Folder;
        }
        let lower = key.to_ascii_lowercase();
        let has = |extensions: &[&str]| extensions.iter().any(|ext| lower.ends_with(ext));
        if has(DATA_FILE_EXTENSIONS) {
            AssetKind::DataFile
        } else if has(SCRIPT_EXTENSIONS) {
            AssetKind::Script
        } else if has(TEXT_FILE_EXTENSIONS) {
            AssetKind::TextFile
        } else if has(ARCHIVE_EXTENSIONS) {
            AssetKind::Archive
        } else {
            AssetKind::File
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Folder => "Folder",
            AssetKind::File => "File",
            AssetKind::DataFile => "Data File",
            AssetKind::Script => "Script",
            AssetKind::TextFile => "Text File",
            AssetKind::Archive => "Archive",
            AssetKind::Table => "Table",
            AssetKind::Queue => "Queue",
        }
    }

    pub fn from_str_lossy(value: &str) -> Self {
        match value {
            "Folder" => AssetKind::Folder,
            "Data File" => AssetKind::DataFile,
            "Script" => AssetKind::Script,
            "Text File" => AssetKind::TextFile,
            "Archive" => AssetKind::Archive,
            "Table" => AssetKind::Table,
            "Queue" => AssetKind::Queue,
            _ => AssetKind::File,
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AssetKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AssetKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(AssetKind::from_str_lossy(&value))
    }
}

/// One discovered object, not yet merged into the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// Source-derived URI; the idempotency key for reconciliation.
    pub id: String,
    /// Leaf name of the object.
    pub name: String,
    pub kind: AssetKind,
    /// Top-level container (bucket, share, account).
    pub catalog: String,
    /// Path prefix or logical namespace within the catalog.
    pub schema_path: String,
    /// 0 when the source omits it, never null.
    pub size_bytes: i64,
    /// Discovery time when the source omits it, never null.
    pub last_modified: DateTime<Utc>,
    /// Data source label (e.g. "Object Store").
    pub source: String,
}

/// Per-container result grouping so callers can report partial success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSummary {
    pub name: String,
    pub asset_count: usize,
}

/// A container or path that failed to enumerate and was excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerFailure {
    pub name: String,
    pub error: String,
}

/// Result of one discovery call: the flat asset list plus the per-container
/// grouping and any recorded enumeration failures.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub assets: Vec<AssetDescriptor>,
    pub containers: Vec<ContainerSummary>,
    pub failures: Vec<ContainerFailure>,
}

impl Discovery {
    pub fn record_failure<E: std::fmt::Display>(&mut self, name: &str, error: E) {
        self.failures.push(ContainerFailure {
            name: name.to_string(),
            error: error.to_string(),
        });
    }
}

/// Leaf name of a slash-separated object key.
pub(crate) fn leaf_name(key: &str) -> String {
    let trimmed = key.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((_, leaf)) => leaf.to_string(),
        None => trimmed.to_string(),
    }
}

/// Path prefix of a slash-separated object key; "/" for top-level objects.
pub(crate) fn schema_of(key: &str) -> String {
    let trimmed = key.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((prefix, _)) => prefix.to_string(),
        None => "/".to_string(),
    }
}

// Asset id constructors. These URIs must stay stable across repeated
// discovery of the same remote object: the event-ingestion path rebuilds
// them from raw change notifications and relies on exact matches.

pub fn object_asset_id(account: &str, container: &str, key: &str) -> String {
    format!("obs://{account}/{container}/{key}")
}

pub fn share_asset_id(account: &str, share: &str, path: &str) -> String {
    format!("share://{account}/{share}/{path}")
}

pub fn table_asset_id(account: &str, table: &str) -> String {
    format!("table://{account}/{table}")
}

pub fn queue_asset_id(account: &str, queue: &str) -> String {
    format!("queue://{account}/{queue}")
}

pub fn file_asset_id(path: &std::path::Path) -> String {
    format!("file://{}", path.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_data_files() {
        assert_eq!(AssetKind::classify("report.parquet"), AssetKind::DataFile);
        assert_eq!(AssetKind::classify("sales/2025/data.CSV"), AssetKind::DataFile);
        assert_eq!(AssetKind::classify("events.json"), AssetKind::DataFile);
    }

    #[test]
    fn classify_scripts_text_and_archives() {
        assert_eq!(AssetKind::classify("run.py"), AssetKind::Script);
        assert_eq!(AssetKind::classify("etl/load.sql"), AssetKind::Script);
        assert_eq!(AssetKind::classify("notes.txt"), AssetKind::TextFile);
        assert_eq!(AssetKind::classify("server.log"), AssetKind::TextFile);
        assert_eq!(AssetKind::classify("archive.tar.gz"), AssetKind::Archive);
        assert_eq!(AssetKind::classify("backup.zip"), AssetKind::Archive);
    }

    #[test]
    fn classify_folders_and_fallback() {
        assert_eq!(AssetKind::classify("staging/"), AssetKind::Folder);
        assert_eq!(AssetKind::classify("binary.bin"), AssetKind::File);
        assert_eq!(AssetKind::classify("README"), AssetKind::File);
    }

    #[test]
    fn kind_round_trips_display_strings() {
        for kind in [
            AssetKind::Folder,
            AssetKind::File,
            AssetKind::DataFile,
            AssetKind::Script,
            AssetKind::TextFile,
            AssetKind::Archive,
            AssetKind::Table,
            AssetKind::Queue,
        ] {
            assert_eq!(AssetKind::from_str_lossy(kind.as_str()), kind);
        }
    }

    #[test]
    fn leaf_and_schema_split_keys() {
        assert_eq!(leaf_name("a/b/c.csv"), "c.csv");
        assert_eq!(leaf_name("c.csv"), "c.csv");
        assert_eq!(leaf_name("a/b/"), "b");
        assert_eq!(schema_of("a/b/c.csv"), "a/b");
        assert_eq!(schema_of("c.csv"), "/");
    }

    #[test]
    fn asset_ids_are_stable() {
        assert_eq!(
            object_asset_id("acct", "bucket", "dir/x.csv"),
            "obs://acct/bucket/dir/x.csv"
        );
        assert_eq!(table_asset_id("acct", "orders"), "table://acct/orders");
    }
}
