//! Adaptive-batch migration engine

pub mod batcher;
pub mod coordinator;
pub mod pool;
pub mod retry;
pub mod summary;

pub use batcher::{BatchController, BatchSignal, BatchSizeState};
pub use coordinator::{MigrationCoordinator, MigrationRunContext, RunPhase};
pub use pool::{BatchOutcome, ConcurrencyPool, FailedRecord};
pub use retry::{FailureQueue, RetryScheduler};
pub use summary::{CollectionOutcome, MigrationSummary};
