//! Bounded-concurrency batch writes
//!
//! One batch at a time: every record in the batch is upserted under a
//! fixed admission gate, and the caller gets the outcome only after every
//! record has settled. Batches never overlap each other; records within a
//! batch have no ordering guarantee.

use crate::adapters::DestinationStore;
use crate::domain::{Record, RecordId, UpsertError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// A record that failed its upsert, with the reason
#[derive(Debug, Clone)]
pub struct FailedRecord {
    /// The record, carried whole so it can be requeued
    pub record: Record,
    /// Why the upsert failed
    pub error: UpsertError,
}

/// Full settle of one batch
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Ids written successfully
    pub succeeded: Vec<RecordId>,
    /// Records that failed, for the failure queue
    pub failed: Vec<FailedRecord>,
}

impl BatchOutcome {
    /// Whether any failure was the destination's rate-limit signal
    pub fn saw_rate_limit(&self) -> bool {
        self.failed.iter().any(|f| f.error.is_rate_limited())
    }

    /// Whether every record in the batch succeeded
    pub fn is_full_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Executes destination writes with a fixed in-flight ceiling
pub struct ConcurrencyPool {
    destination: Arc<dyn DestinationStore>,
    gate: Arc<Semaphore>,
    upsert_timeout: Duration,
}

impl ConcurrencyPool {
    /// Create a pool with the given ceiling and per-call timeout
    pub fn new(
        destination: Arc<dyn DestinationStore>,
        ceiling: usize,
        upsert_timeout: Duration,
    ) -> Self {
        Self {
            destination,
            gate: Arc::new(Semaphore::new(ceiling.max(1))),
            upsert_timeout,
        }
    }

    /// Upsert every record in the batch and wait for all of them to settle
    ///
    /// The semaphore keeps at most `ceiling` calls in flight even when the
    /// batch is much larger. Each call carries its own timeout; a timeout
    /// counts as a plain failure, not a rate-limit.
    pub async fn write_batch(&self, batch: Vec<Record>) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        if batch.is_empty() {
            return outcome;
        }

        let mut tasks: JoinSet<Result<RecordId, FailedRecord>> = JoinSet::new();
        for record in batch {
            let destination = self.destination.clone();
            let gate = self.gate.clone();
            let timeout = self.upsert_timeout;

            tasks.spawn(async move {
                // Closed only on pool drop, which cannot happen while the
                // task set is being awaited.
                let _permit = match gate.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return Err(FailedRecord {
                            error: UpsertError::Other("admission gate closed".to_string()),
                            record,
                        })
                    }
                };

                match tokio::time::timeout(timeout, destination.upsert(&record)).await {
                    Ok(Ok(())) => Ok(record.id.clone()),
                    Ok(Err(error)) => Err(FailedRecord { record, error }),
                    Err(_) => Err(FailedRecord {
                        record,
                        error: UpsertError::Timeout,
                    }),
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(id)) => outcome.succeeded.push(id),
                Ok(Err(failed)) => outcome.failed.push(failed),
                Err(e) => {
                    // A panicked write task loses its record; surface loudly.
                    tracing::error!(error = %e, "upsert task panicked");
                }
            }
        }

        outcome
    }
}
