//! Telemetry event model
//!
//! `MigrationEvent`s are append-only: constructed once, recorded, never
//! mutated. The post-run efficiency analysis reads them back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Classification of a telemetry event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A batch settled (successfully or not); carries its duration
    Batch,
    /// A batch had failed records
    Error,
    /// The run aborted during backup or pull
    Fatal,
}

/// One structured telemetry event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationEvent {
    /// Event classification
    pub kind: EventKind,
    /// Number of records in the batch this event describes (0 for fatal)
    pub batch_size: usize,
    /// Wall-clock duration of the batch in milliseconds
    pub duration_ms: u64,
    /// Failure description, present for Error and Fatal events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the event was created
    pub timestamp: DateTime<Utc>,
    /// Run this event belongs to
    pub run_id: Uuid,
}

impl MigrationEvent {
    /// A settled batch
    pub fn batch(run_id: Uuid, batch_size: usize, duration_ms: u64) -> Self {
        Self {
            kind: EventKind::Batch,
            batch_size,
            duration_ms,
            error: None,
            timestamp: Utc::now(),
            run_id,
        }
    }

    /// A batch with failures
    pub fn error(run_id: Uuid, batch_size: usize, duration_ms: u64, error: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Error,
            batch_size,
            duration_ms,
            error: Some(error.into()),
            timestamp: Utc::now(),
            run_id,
        }
    }

    /// An unrecoverable abort
    pub fn fatal(run_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Fatal,
            batch_size: 0,
            duration_ms: 0,
            error: Some(error.into()),
            timestamp: Utc::now(),
            run_id,
        }
    }
}
