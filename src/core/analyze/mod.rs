//! Post-run efficiency analysis
//!
//! A read-only scan over the run's recorded batch events that flags
//! anomalously slow batches. Purely advisory: it affects neither the
//! migrated data nor the run's success status.

use crate::domain::{EventKind, MigrationEvent};
use chrono::{DateTime, Utc};
use std::fmt;

/// One flagged slow batch
#[derive(Debug, Clone)]
pub struct SlowBatchAdvisory {
    /// Size of the flagged batch
    pub batch_size: usize,
    /// Its duration in milliseconds
    pub duration_ms: u64,
    /// When the batch settled
    pub timestamp: DateTime<Utc>,
}

/// Result of the post-run scan
#[derive(Debug, Clone)]
pub struct AdvisoryReport {
    /// Number of batch events scanned
    pub batches_scanned: usize,
    /// Mean batch duration in milliseconds
    pub mean_duration_ms: f64,
    /// Threshold a batch had to exceed to be flagged
    pub threshold_ms: f64,
    /// Flagged batches, in recording order
    pub advisories: Vec<SlowBatchAdvisory>,
}

impl fmt::Display for AdvisoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.advisories.is_empty() {
            return writeln!(
                f,
                "  Efficiency: {} batches, mean {:.0}ms, no slow batches",
                self.batches_scanned, self.mean_duration_ms
            );
        }
        writeln!(
            f,
            "  Efficiency: {} of {} batches exceeded {:.0}ms (mean {:.0}ms) - consider smaller batches or a lower concurrency ceiling",
            self.advisories.len(),
            self.batches_scanned,
            self.threshold_ms,
            self.mean_duration_ms
        )?;
        for advisory in &self.advisories {
            writeln!(
                f,
                "    - {} records in {}ms at {}",
                advisory.batch_size,
                advisory.duration_ms,
                advisory.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ")
            )?;
        }
        Ok(())
    }
}

/// Flags batches slower than `multiplier x mean`
#[derive(Debug, Clone)]
pub struct EfficiencyAnalyzer {
    slow_multiplier: f64,
}

impl EfficiencyAnalyzer {
    /// Create an analyzer with the configured slow-batch multiplier
    pub fn new(slow_multiplier: f64) -> Self {
        Self { slow_multiplier }
    }

    /// Scan recorded events, considering only `Batch` events
    pub fn analyze(&self, events: &[MigrationEvent]) -> AdvisoryReport {
        let batches: Vec<&MigrationEvent> = events
            .iter()
            .filter(|e| e.kind == EventKind::Batch)
            .collect();

        if batches.is_empty() {
            return AdvisoryReport {
                batches_scanned: 0,
                mean_duration_ms: 0.0,
                threshold_ms: 0.0,
                advisories: Vec::new(),
            };
        }

        let mean = batches.iter().map(|e| e.duration_ms as f64).sum::<f64>() / batches.len() as f64;
        let threshold = mean * self.slow_multiplier;

        let advisories = batches
            .iter()
            .filter(|e| e.duration_ms as f64 > threshold)
            .map(|e| SlowBatchAdvisory {
                batch_size: e.batch_size,
                duration_ms: e.duration_ms,
                timestamp: e.timestamp,
            })
            .collect();

        AdvisoryReport {
            batches_scanned: batches.len(),
            mean_duration_ms: mean,
            threshold_ms: threshold,
            advisories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn batch(duration_ms: u64) -> MigrationEvent {
        MigrationEvent::batch(Uuid::nil(), 100, duration_ms)
    }

    #[test]
    fn test_flags_batches_over_twice_the_mean() {
        let events = vec![batch(100), batch(100), batch(100), batch(700)];
        // mean 250, threshold 500
        let report = EfficiencyAnalyzer::new(2.0).analyze(&events);

        assert_eq!(report.batches_scanned, 4);
        assert_eq!(report.mean_duration_ms, 250.0);
        assert_eq!(report.advisories.len(), 1);
        assert_eq!(report.advisories[0].duration_ms, 700);
    }

    #[test]
    fn test_multiplier_is_configurable() {
        let events = vec![batch(100), batch(300)];
        // mean 200; at 1.0x the 300ms batch is flagged, at 2.0x nothing is
        assert_eq!(EfficiencyAnalyzer::new(1.0).analyze(&events).advisories.len(), 1);
        assert_eq!(EfficiencyAnalyzer::new(2.0).analyze(&events).advisories.len(), 0);
    }

    #[test]
    fn test_ignores_error_and_fatal_events() {
        let events = vec![
            batch(100),
            MigrationEvent::error(Uuid::nil(), 100, 9_999, "boom"),
            MigrationEvent::fatal(Uuid::nil(), "dead"),
        ];
        let report = EfficiencyAnalyzer::new(2.0).analyze(&events);
        assert_eq!(report.batches_scanned, 1);
        assert!(report.advisories.is_empty());
    }

    #[test]
    fn test_empty_run() {
        let report = EfficiencyAnalyzer::new(2.0).analyze(&[]);
        assert_eq!(report.batches_scanned, 0);
        assert!(report.advisories.is_empty());
        assert!(report.to_string().contains("no slow batches"));
    }

    #[test]
    fn test_report_renders_advisories() {
        let events = vec![batch(10), batch(10), batch(100)];
        let report = EfficiencyAnalyzer::new(2.0).analyze(&events);
        let rendered = report.to_string();
        assert!(rendered.contains("1 of 3 batches"));
        assert!(rendered.contains("100 records in 100ms"));
    }
}
