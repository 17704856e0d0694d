//! External store integrations
//!
//! Traits define the seams to the source store, destination store,
//! snapshot storage and the two telemetry channels. Concrete backends:
//! filesystem (production) and in-memory (tests, failure injection).

pub mod fs;
pub mod memory;
pub mod traits;

pub use traits::{DestinationStore, EventLog, MetricsSink, SnapshotStore, SourceStore};
