//! Failure queue and retry scheduling
//!
//! Records whose upsert failed accumulate here, each carrying its own
//! destination tag. The scheduler drains the queue in bounded rounds with
//! exponential backoff; the driver resubmits each round's records through
//! the regular batch pipeline, grouped by each record's own kind.

use crate::domain::{Record, RecordKind};
use std::collections::BTreeMap;
use std::time::Duration;

/// Records pending retry
///
/// Drained wholesale at the start of a round; failures during the round
/// are pushed back for the next one, so a record appears at most once per
/// round.
#[derive(Debug, Default)]
pub struct FailureQueue {
    records: Vec<Record>,
}

impl FailureQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a failed record
    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    /// Take the current contents, leaving the queue empty
    pub fn drain(&mut self) -> Vec<Record> {
        std::mem::take(&mut self.records)
    }

    /// Number of queued records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Group the queue's contents by destination kind, preserving order
    /// within each group
    pub fn drain_by_kind(&mut self) -> BTreeMap<&'static str, (RecordKind, Vec<Record>)> {
        let mut groups: BTreeMap<&'static str, (RecordKind, Vec<Record>)> = BTreeMap::new();
        for record in self.drain() {
            groups
                .entry(record.kind.collection())
                .or_insert_with(|| (record.kind, Vec::new()))
                .1
                .push(record);
        }
        groups
    }
}

/// Exponential-backoff retry policy
///
/// Round `k` (0-indexed) waits `2^k` base-delay units before resubmitting;
/// no round runs at `k = max_rounds`.
#[derive(Debug, Clone)]
pub struct RetryScheduler {
    max_rounds: u32,
    base_delay: Duration,
}

impl RetryScheduler {
    /// Create a scheduler with the given cap and base delay
    pub fn new(max_rounds: u32, base_delay: Duration) -> Self {
        Self {
            max_rounds,
            base_delay,
        }
    }

    /// Number of retry rounds the scheduler will run
    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// Backoff before round `round`
    pub fn delay_for(&self, round: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(round)
    }

    /// Suspend for the backoff of `round`
    ///
    /// Blocks only the retry path; by the run's serial design nothing else
    /// is waiting on this task.
    pub async fn wait_before(&self, round: u32) {
        let delay = self.delay_for(round);
        tracing::info!(
            round,
            delay_ms = delay.as_millis() as u64,
            "Backing off before retry round"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_queue_drain_empties() {
        let mut queue = FailureQueue::new();
        queue.push(Record::new("u-1", RecordKind::User));
        queue.push(Record::new("tx-1", RecordKind::Transaction));
        assert_eq!(queue.len(), 2);

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_drain_by_kind_routes_per_record() {
        let mut queue = FailureQueue::new();
        queue.push(Record::new("tx-1", RecordKind::Transaction));
        queue.push(Record::new("u-1", RecordKind::User));
        queue.push(Record::new("tx-2", RecordKind::Transaction));

        let groups = queue.drain_by_kind();
        assert!(queue.is_empty());

        let (kind, transactions) = &groups["transactions"];
        assert_eq!(*kind, RecordKind::Transaction);
        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].id.as_str(), "tx-1");

        let (kind, users) = &groups["users"];
        assert_eq!(*kind, RecordKind::User);
        assert_eq!(users.len(), 1);
    }

    #[test_case(0, 1; "round zero waits one unit")]
    #[test_case(1, 2; "round one waits two units")]
    #[test_case(2, 4; "round two waits four units")]
    #[test_case(3, 8; "round three waits eight units")]
    #[test_case(4, 16; "round four waits sixteen units")]
    fn test_backoff_doubles(round: u32, units: u64) {
        let scheduler = RetryScheduler::new(5, Duration::from_secs(1));
        assert_eq!(scheduler.delay_for(round), Duration::from_secs(units));
    }

    #[test]
    fn test_max_rounds() {
        let scheduler = RetryScheduler::new(5, Duration::from_millis(100));
        assert_eq!(scheduler.max_rounds(), 5);
    }
}
