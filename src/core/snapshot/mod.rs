//! Pre-migration snapshots and operator-triggered restore
//!
//! A snapshot is an immutable point-in-time export of one source
//! collection, written to addressable storage before any destination
//! mutation for that collection. Restore is the rollback path: a bulk
//! idempotent set of the snapshot's records back into the source. It is
//! never invoked by the migration run itself.

use crate::adapters::{SnapshotStore, SourceStore};
use crate::domain::{CaravanError, FatalError, Record, RecordKind, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Self-describing snapshot payload
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEnvelope {
    collection: String,
    created_at: DateTime<Utc>,
    /// Hex SHA-256 of the serialized record array, verified on restore
    sha256: String,
    records: Vec<Record>,
}

fn digest_records(records: &[Record]) -> Result<String> {
    let bytes = serde_json::to_vec(records)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Exports collections to immutable storage and restores them
pub struct SnapshotManager {
    source: Arc<dyn SourceStore>,
    store: Arc<dyn SnapshotStore>,
}

impl SnapshotManager {
    /// Create a manager over a source and a snapshot store
    pub fn new(source: Arc<dyn SourceStore>, store: Arc<dyn SnapshotStore>) -> Self {
        Self { source, store }
    }

    /// Export the full collection and return the generated snapshot key
    ///
    /// # Errors
    ///
    /// Any source-read or storage failure here is a [`FatalError`]: the
    /// run must abort before mutating the destination.
    pub async fn backup(&self, kind: RecordKind) -> std::result::Result<String, FatalError> {
        let collection = kind.collection();
        let records =
            self.source
                .list_all(kind)
                .await
                .map_err(|message| FatalError::SourceRead {
                    collection: collection.to_string(),
                    message,
                })?;

        let created_at = Utc::now();
        let key = format!("{collection}-{}.json", created_at.timestamp_millis());

        let envelope = SnapshotEnvelope {
            collection: collection.to_string(),
            created_at,
            sha256: digest_records(&records).map_err(|e| FatalError::SnapshotWrite {
                collection: collection.to_string(),
                message: e.to_string(),
            })?,
            records,
        };
        let bytes = serde_json::to_vec(&envelope).map_err(|e| FatalError::SnapshotWrite {
            collection: collection.to_string(),
            message: e.to_string(),
        })?;

        self.store
            .put(&key, bytes)
            .await
            .map_err(|message| FatalError::SnapshotWrite {
                collection: collection.to_string(),
                message,
            })?;

        tracing::info!(
            collection,
            snapshot_id = %key,
            records = envelope.records.len(),
            "Snapshot written"
        );
        Ok(key)
    }

    /// Restore a snapshot back into the source collection
    ///
    /// Verifies the stored digest, then bulk-sets every contained record.
    /// Returns the number of records restored.
    pub async fn restore(&self, kind: RecordKind, snapshot_id: &str) -> Result<usize> {
        let bytes = self
            .store
            .get(snapshot_id)
            .await
            .map_err(CaravanError::Snapshot)?;
        let envelope: SnapshotEnvelope = serde_json::from_slice(&bytes)?;

        if envelope.collection != kind.collection() {
            return Err(CaravanError::Snapshot(format!(
                "snapshot {snapshot_id} holds '{}', not '{}'",
                envelope.collection,
                kind.collection()
            )));
        }

        let digest = digest_records(&envelope.records)?;
        if digest != envelope.sha256 {
            return Err(CaravanError::Snapshot(format!(
                "digest mismatch for {snapshot_id}: expected {}, computed {digest}",
                envelope.sha256
            )));
        }

        self.source
            .put_all(kind, &envelope.records)
            .await
            .map_err(CaravanError::Source)?;

        tracing::info!(
            collection = %kind,
            snapshot_id,
            records = envelope.records.len(),
            "Snapshot restored"
        );
        Ok(envelope.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{MemorySnapshotStore, MemorySource};
    use serde_json::json;

    fn seeded_source() -> Arc<MemorySource> {
        let source = Arc::new(MemorySource::new());
        source.seed(
            RecordKind::User,
            vec![
                Record::new("u-1", RecordKind::User).with_field("name", json!("Ada")),
                Record::new("u-2", RecordKind::User).with_field("name", json!("Grace")),
            ],
        );
        source
    }

    #[tokio::test]
    async fn test_backup_then_restore_roundtrip() {
        let source = seeded_source();
        let store = Arc::new(MemorySnapshotStore::new());
        let manager = SnapshotManager::new(source.clone(), store);

        let before = source.contents(RecordKind::User);
        let snapshot_id = manager.backup(RecordKind::User).await.unwrap();

        // Clobber the source, then roll back.
        source.seed(RecordKind::User, Vec::new());
        let restored = manager.restore(RecordKind::User, &snapshot_id).await.unwrap();

        assert_eq!(restored, 2);
        let mut after = source.contents(RecordKind::User);
        after.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_backup_key_names_collection() {
        let manager =
            SnapshotManager::new(seeded_source(), Arc::new(MemorySnapshotStore::new()));
        let snapshot_id = manager.backup(RecordKind::User).await.unwrap();
        assert!(snapshot_id.starts_with("users-"));
        assert!(snapshot_id.ends_with(".json"));
    }

    #[tokio::test]
    async fn test_backup_source_read_failure_is_fatal() {
        let source = Arc::new(MemorySource::new());
        source.fail_reads();
        let manager = SnapshotManager::new(source, Arc::new(MemorySnapshotStore::new()));

        let err = manager.backup(RecordKind::User).await.unwrap_err();
        assert!(matches!(err, FatalError::SourceRead { .. }));
    }

    #[tokio::test]
    async fn test_backup_store_write_failure_is_fatal() {
        let store = Arc::new(MemorySnapshotStore::new());
        store.fail_writes();
        let manager = SnapshotManager::new(seeded_source(), store);

        let err = manager.backup(RecordKind::User).await.unwrap_err();
        assert!(matches!(err, FatalError::SnapshotWrite { .. }));
    }

    #[tokio::test]
    async fn test_restore_rejects_wrong_collection() {
        let source = seeded_source();
        let store = Arc::new(MemorySnapshotStore::new());
        let manager = SnapshotManager::new(source, store);

        let snapshot_id = manager.backup(RecordKind::User).await.unwrap();
        let err = manager
            .restore(RecordKind::Transaction, &snapshot_id)
            .await
            .unwrap_err();
        assert!(matches!(err, CaravanError::Snapshot(_)));
    }

    #[tokio::test]
    async fn test_restore_missing_snapshot() {
        let manager =
            SnapshotManager::new(seeded_source(), Arc::new(MemorySnapshotStore::new()));
        assert!(manager
            .restore(RecordKind::User, "users-0.json")
            .await
            .is_err());
    }
}
