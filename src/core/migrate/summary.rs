//! Run summary and reporting

use crate::core::analyze::AdvisoryReport;
use crate::domain::{RecordId, RecordKind};
use std::fmt::Write as _;
use std::time::Duration;
use uuid::Uuid;

/// Per-collection tally
#[derive(Debug, Clone)]
pub struct CollectionOutcome {
    /// Collection kind
    pub kind: RecordKind,
    /// Records pulled from the source
    pub pulled: usize,
    /// Records written to the destination
    pub migrated: usize,
    /// Snapshot key written before migration began
    pub snapshot_id: String,
}

/// Summary of a migration run
#[derive(Debug, Clone)]
pub struct MigrationSummary {
    /// Run identity, shared with every telemetry event
    pub run_id: Uuid,
    /// Per-collection outcomes, in migration order
    pub collections: Vec<CollectionOutcome>,
    /// Records that exhausted the retry cap; reported, never dropped
    pub permanently_failed: Vec<RecordId>,
    /// Records not attempted because shutdown was requested
    pub skipped: usize,
    /// Wall-clock duration of the run
    pub duration: Duration,
    /// Slow-batch advisories from the post-run analysis
    pub advisories: Option<AdvisoryReport>,
}

impl MigrationSummary {
    /// Create an empty summary for a run
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            collections: Vec::new(),
            permanently_failed: Vec::new(),
            skipped: 0,
            duration: Duration::ZERO,
            advisories: None,
        }
    }

    /// Total records written to the destination
    pub fn total_migrated(&self) -> usize {
        self.collections.iter().map(|c| c.migrated).sum()
    }

    /// Total records pulled from the source
    pub fn total_pulled(&self) -> usize {
        self.collections.iter().map(|c| c.pulled).sum()
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Log the summary through the structured logger
    pub fn log_summary(&self) {
        tracing::info!(
            run_id = %self.run_id,
            pulled = self.total_pulled(),
            migrated = self.total_migrated(),
            permanently_failed = self.permanently_failed.len(),
            skipped = self.skipped,
            duration_secs = self.duration.as_secs(),
            "Migration run completed"
        );
        for outcome in &self.collections {
            tracing::info!(
                collection = %outcome.kind,
                pulled = outcome.pulled,
                migrated = outcome.migrated,
                snapshot_id = %outcome.snapshot_id,
                "Collection migrated"
            );
        }
        if !self.permanently_failed.is_empty() {
            tracing::warn!(
                count = self.permanently_failed.len(),
                ids = ?self.permanently_failed,
                "Records failed permanently after exhausting retries"
            );
        }
    }

    /// Human-readable report for the operator
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Migration run {}", self.run_id);
        let _ = writeln!(out, "  Duration: {:.1}s", self.duration.as_secs_f64());
        for outcome in &self.collections {
            let _ = writeln!(
                out,
                "  {}: {}/{} migrated (snapshot {})",
                outcome.kind, outcome.migrated, outcome.pulled, outcome.snapshot_id
            );
        }
        if self.skipped > 0 {
            let _ = writeln!(out, "  Skipped (shutdown requested): {}", self.skipped);
        }
        if self.permanently_failed.is_empty() {
            let _ = writeln!(out, "  Permanently failed: none");
        } else {
            let _ = writeln!(
                out,
                "  Permanently failed ({}):",
                self.permanently_failed.len()
            );
            for id in &self.permanently_failed {
                let _ = writeln!(out, "    - {id}");
            }
        }
        if let Some(report) = &self.advisories {
            out.push_str(&report.to_string());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary_with_data() -> MigrationSummary {
        let mut summary = MigrationSummary::new(Uuid::new_v4());
        summary.collections.push(CollectionOutcome {
            kind: RecordKind::User,
            pulled: 100,
            migrated: 98,
            snapshot_id: "users-1700000000000.json".to_string(),
        });
        summary.collections.push(CollectionOutcome {
            kind: RecordKind::Transaction,
            pulled: 50,
            migrated: 50,
            snapshot_id: "transactions-1700000000001.json".to_string(),
        });
        summary.permanently_failed.push(RecordId::new("u-13"));
        summary.permanently_failed.push(RecordId::new("u-77"));
        summary
    }

    #[test]
    fn test_totals() {
        let summary = summary_with_data();
        assert_eq!(summary.total_pulled(), 150);
        assert_eq!(summary.total_migrated(), 148);
    }

    #[test]
    fn test_render_lists_failed_ids() {
        let rendered = summary_with_data().render();
        assert!(rendered.contains("users: 98/100 migrated"));
        assert!(rendered.contains("Permanently failed (2):"));
        assert!(rendered.contains("- u-13"));
        assert!(rendered.contains("- u-77"));
    }

    #[test]
    fn test_render_clean_run() {
        let summary = MigrationSummary::new(Uuid::new_v4());
        let rendered = summary.render();
        assert!(rendered.contains("Permanently failed: none"));
        assert!(!rendered.contains("Skipped"));
    }
}
