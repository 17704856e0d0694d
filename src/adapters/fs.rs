//! Filesystem-backed store adapters
//!
//! - [`JsonDirSource`] reads each collection from `<root>/<collection>.json`
//!   (a JSON array of objects carrying an `"id"` field).
//! - [`JsonDirDestination`] writes one file per record under
//!   `<root>/<collection>/<id>.json`; writing the same id again overwrites
//!   the same path, which makes the upsert idempotent.
//! - [`DirSnapshotStore`] stores snapshot blobs as files under a directory.
//! - [`JsonlEventLog`] appends one JSON line per telemetry event.
//! - [`TracingMetricsSink`] forwards events to the process tracing
//!   pipeline on a dedicated metrics target.

use crate::domain::{MigrationEvent, Record, RecordId, RecordKind, TelemetryError, UpsertError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use super::traits::{DestinationStore, EventLog, MetricsSink, SnapshotStore, SourceStore};

/// Source store reading JSON-array collection files from a directory
pub struct JsonDirSource {
    root: PathBuf,
}

impl JsonDirSource {
    /// Create a source rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn collection_path(&self, kind: RecordKind) -> PathBuf {
        self.root.join(format!("{}.json", kind.collection()))
    }
}

#[async_trait]
impl SourceStore for JsonDirSource {
    async fn list_all(&self, kind: RecordKind) -> Result<Vec<Record>, String> {
        let path = self.collection_path(kind);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| format!("read {}: {e}", path.display()))?;

        let docs: Vec<serde_json::Map<String, serde_json::Value>> =
            serde_json::from_slice(&bytes).map_err(|e| format!("parse {}: {e}", path.display()))?;

        let mut records = Vec::with_capacity(docs.len());
        for mut doc in docs {
            let id = match doc.remove("id") {
                Some(serde_json::Value::String(id)) => id,
                _ => return Err(format!("{}: document without string 'id'", path.display())),
            };
            records.push(Record {
                id: RecordId::new(id),
                kind,
                fields: doc,
            });
        }
        Ok(records)
    }

    async fn put_all(&self, kind: RecordKind, records: &[Record]) -> Result<(), String> {
        let path = self.collection_path(kind);

        // Overlay onto whatever the collection currently holds, keyed by id.
        let mut existing: Vec<Record> = match tokio::fs::read(&path).await {
            Ok(_) => self.list_all(kind).await.unwrap_or_default(),
            Err(_) => Vec::new(),
        };
        existing.retain(|r| !records.iter().any(|n| n.id == r.id));
        existing.extend_from_slice(records);

        let docs: Vec<serde_json::Value> = existing
            .iter()
            .map(|r| {
                let mut doc = r.fields.clone();
                doc.insert("id".to_string(), serde_json::Value::String(r.id.to_string()));
                serde_json::Value::Object(doc)
            })
            .collect();

        let bytes = serde_json::to_vec_pretty(&docs).map_err(|e| e.to_string())?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| e.to_string())?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| format!("write {}: {e}", path.display()))
    }
}

/// Destination store writing one JSON file per record
pub struct JsonDirDestination {
    root: PathBuf,
}

impl JsonDirDestination {
    /// Create a destination rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn record_path(&self, record: &Record) -> PathBuf {
        self.root
            .join(record.kind.collection())
            .join(format!("{}.json", record.id))
    }
}

#[async_trait]
impl DestinationStore for JsonDirDestination {
    async fn upsert(&self, record: &Record) -> Result<(), UpsertError> {
        let path = self.record_path(record);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| UpsertError::Other(e.to_string()))?;
        }

        let bytes =
            serde_json::to_vec_pretty(record).map_err(|e| UpsertError::Other(e.to_string()))?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| UpsertError::Other(format!("write {}: {e}", path.display())))
    }
}

/// Snapshot store writing blobs under a directory
pub struct DirSnapshotStore {
    root: PathBuf,
}

impl DirSnapshotStore {
    /// Create a snapshot store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        // Keys are generated internally (collection-timestamp); strip any
        // path separators defensively all the same.
        let safe: String = key.chars().filter(|c| *c != '/' && *c != '\\').collect();
        self.root.join(safe)
    }
}

#[async_trait]
impl SnapshotStore for DirSnapshotStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), String> {
        let path = self.key_path(key);
        if path.exists() {
            return Err(format!("snapshot key already exists: {key}"));
        }
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| e.to_string())?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| format!("write {}: {e}", path.display()))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, String> {
        let path = self.key_path(key);
        tokio::fs::read(&path)
            .await
            .map_err(|e| format!("read {}: {e}", path.display()))
    }
}

/// Durable append-only event log, one JSON object per line
pub struct JsonlEventLog {
    path: PathBuf,
}

impl JsonlEventLog {
    /// Create a log appending to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl EventLog for JsonlEventLog {
    async fn append(&self, event: &MigrationEvent) -> Result<(), TelemetryError> {
        let mut line = serde_json::to_vec(event)
            .map_err(|e| TelemetryError::new("event-log", e.to_string()))?;
        line.push(b'\n');

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TelemetryError::new("event-log", e.to_string()))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| TelemetryError::new("event-log", e.to_string()))?;
        file.write_all(&line)
            .await
            .map_err(|e| TelemetryError::new("event-log", e.to_string()))
    }
}

/// Metrics sink forwarding events to the tracing pipeline
///
/// Dashboards subscribe to the `caravan::metrics` target. Emitting a
/// tracing event cannot fail, so this sink is infallible.
pub struct TracingMetricsSink;

#[async_trait]
impl MetricsSink for TracingMetricsSink {
    async fn track_event(&self, name: &str, event: &MigrationEvent) -> Result<(), TelemetryError> {
        tracing::info!(
            target: "caravan::metrics",
            name,
            kind = ?event.kind,
            batch_size = event.batch_size,
            duration_ms = event.duration_ms,
            error = event.error.as_deref(),
            run_id = %event.run_id,
            "metric"
        );
        Ok(())
    }
}
