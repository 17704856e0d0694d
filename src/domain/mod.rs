//! Core domain types and models

pub mod errors;
pub mod event;
pub mod record;

pub use errors::{CaravanError, FatalError, TelemetryError, UpsertError};
pub use event::{EventKind, MigrationEvent};
pub use record::{Record, RecordId, RecordKind};

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, CaravanError>;
