//! Store abstraction traits
//!
//! This module defines the traits that store adapters must implement to
//! work with the migration engine.

use crate::domain::{MigrationEvent, Record, RecordKind, TelemetryError, UpsertError};
use async_trait::async_trait;

/// Source document store
///
/// The engine pulls whole collections at once; no pagination contract is
/// implied beyond "returns everything".
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Read the full contents of a collection, tagging each record with
    /// `kind` at read time.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read. During backup
    /// and pull this is fatal to the run.
    async fn list_all(&self, kind: RecordKind) -> Result<Vec<Record>, String>;

    /// Bulk idempotent set of records back into a collection.
    ///
    /// Used by snapshot restore; repeated application of the same set must
    /// be a no-op.
    async fn put_all(&self, kind: RecordKind, records: &[Record]) -> Result<(), String>;
}

/// Destination document store
///
/// `upsert` is keyed by `Record.id` and must be idempotent: retries resend
/// previously-attempted records and must not create duplicates.
#[async_trait]
pub trait DestinationStore: Send + Sync {
    /// Write one record to the collection named by its `kind`.
    ///
    /// # Errors
    ///
    /// `UpsertError::RateLimited` is the congestion signal; any other
    /// variant is a plain per-record failure. Both requeue the record.
    async fn upsert(&self, record: &Record) -> Result<(), UpsertError>;
}

/// Immutable, addressable snapshot storage
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Write a snapshot under `key`. Once written a key is never mutated.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), String>;

    /// Read a snapshot back by key.
    async fn get(&self, key: &str) -> Result<Vec<u8>, String>;
}

/// Durable append-only event log (audit/replay channel)
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Append one event.
    async fn append(&self, event: &MigrationEvent) -> Result<(), TelemetryError>;
}

/// External metrics/tracing channel (dashboard channel)
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Track one named event with its properties.
    async fn track_event(&self, name: &str, event: &MigrationEvent) -> Result<(), TelemetryError>;
}
