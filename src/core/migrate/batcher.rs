//! Adaptive batch sizing
//!
//! The controller adjusts the batch size with success / rate-limit
//! feedback the way network congestion control does: grow aggressively
//! while the destination keeps up, back off sharply on a congestion
//! signal. It converges toward the destination's tolerated write rate
//! without manual tuning.

use crate::domain::{Record, Result};

/// Aggregate signal for one settled batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchSignal {
    /// Every record in the batch was upserted
    Success,
    /// The destination rate-limited at least one record
    RateLimited,
    /// Some records failed, but not with a rate-limit signal
    Failed,
}

/// Bounded, mutable batch-size state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSizeState {
    /// Current batch size, always within `[min, max]`
    pub current: usize,
    /// Lower bound
    pub min: usize,
    /// Upper bound
    pub max: usize,
}

/// Owns the batch-size state; the only component allowed to mutate it
#[derive(Debug)]
pub struct BatchController {
    state: BatchSizeState,
}

impl BatchController {
    /// Create a controller with validated bounds
    ///
    /// # Errors
    ///
    /// Returns a configuration error unless `min >= 1` and
    /// `min <= initial <= max`.
    pub fn new(min: usize, initial: usize, max: usize) -> Result<Self> {
        if min == 0 || min > max || initial < min || initial > max {
            return Err(crate::domain::CaravanError::Configuration(format!(
                "invalid batch bounds: min={min}, initial={initial}, max={max}"
            )));
        }
        Ok(Self {
            state: BatchSizeState {
                current: initial,
                min,
                max,
            },
        })
    }

    /// Current batch size
    pub fn current(&self) -> usize {
        self.state.current
    }

    /// Snapshot of the full state
    pub fn state(&self) -> &BatchSizeState {
        &self.state
    }

    /// Up to `current` records starting at `offset`, in original order
    pub fn next_batch<'a>(&self, records: &'a [Record], offset: usize) -> &'a [Record] {
        if offset >= records.len() {
            return &[];
        }
        let end = (offset + self.state.current).min(records.len());
        &records[offset..end]
    }

    /// Apply one batch outcome
    ///
    /// Full success doubles the size (capped at `max`); a rate-limit
    /// signal halves it (integer floor, clamped at `min`); a plain
    /// failure leaves it unchanged.
    pub fn on_batch_result(&mut self, signal: BatchSignal) {
        match signal {
            BatchSignal::Success => {
                self.state.current = (self.state.current * 2).min(self.state.max);
            }
            BatchSignal::RateLimited => {
                self.state.current = (self.state.current / 2).max(self.state.min);
            }
            BatchSignal::Failed => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RecordKind;
    use test_case::test_case;

    fn controller() -> BatchController {
        BatchController::new(10, 100, 1000).unwrap()
    }

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| Record::new(format!("r-{i}"), RecordKind::User))
            .collect()
    }

    #[test]
    fn test_rejects_invalid_bounds() {
        assert!(BatchController::new(0, 100, 1000).is_err());
        assert!(BatchController::new(10, 5, 1000).is_err());
        assert!(BatchController::new(10, 2000, 1000).is_err());
        assert!(BatchController::new(100, 100, 10).is_err());
    }

    #[test_case(100, BatchSignal::Success, 200; "success doubles")]
    #[test_case(600, BatchSignal::Success, 1000; "success capped at max")]
    #[test_case(1000, BatchSignal::Success, 1000; "success at max stays")]
    #[test_case(100, BatchSignal::RateLimited, 50; "rate limit halves")]
    #[test_case(25, BatchSignal::RateLimited, 12; "rate limit floors integer division")]
    #[test_case(15, BatchSignal::RateLimited, 10; "rate limit clamped at min")]
    #[test_case(10, BatchSignal::RateLimited, 10; "rate limit at min stays")]
    #[test_case(100, BatchSignal::Failed, 100; "plain failure unchanged")]
    fn test_adjustment(start: usize, signal: BatchSignal, expected: usize) {
        let mut controller = BatchController::new(10, start, 1000).unwrap();
        controller.on_batch_result(signal);
        assert_eq!(controller.current(), expected);
    }

    #[test]
    fn test_bounds_hold_for_any_signal_sequence() {
        let mut controller = controller();
        let signals = [
            BatchSignal::Success,
            BatchSignal::Success,
            BatchSignal::RateLimited,
            BatchSignal::Failed,
            BatchSignal::RateLimited,
            BatchSignal::RateLimited,
            BatchSignal::RateLimited,
            BatchSignal::RateLimited,
            BatchSignal::Success,
            BatchSignal::Success,
            BatchSignal::Success,
            BatchSignal::Success,
            BatchSignal::Success,
            BatchSignal::Success,
        ];
        for signal in signals {
            controller.on_batch_result(signal);
            assert!(controller.current() >= controller.state().min);
            assert!(controller.current() <= controller.state().max);
        }
    }

    #[test]
    fn test_next_batch_slices_in_order() {
        let controller = controller();
        let records = records(250);

        let first = controller.next_batch(&records, 0);
        assert_eq!(first.len(), 100);
        assert_eq!(first[0].id.as_str(), "r-0");

        let tail = controller.next_batch(&records, 200);
        assert_eq!(tail.len(), 50);
        assert_eq!(tail[0].id.as_str(), "r-200");
    }

    #[test]
    fn test_next_batch_past_end_is_empty() {
        let controller = controller();
        let records = records(10);
        assert!(controller.next_batch(&records, 10).is_empty());
        assert!(controller.next_batch(&records, 500).is_empty());
    }
}
