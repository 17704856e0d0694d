//! Dual-channel telemetry
//!
//! Every event goes to two independent sinks: a durable append-only log
//! for audit/replay and an external metrics channel for dashboards. The
//! sink writes are isolated from each other and from the run: a sink
//! failure is reported to the local diagnostic channel and swallowed,
//! never propagated.

use crate::adapters::{EventLog, MetricsSink};
use crate::domain::MigrationEvent;
use std::sync::Arc;

/// Name under which events are tracked on the metrics channel
const METRIC_EVENT_NAME: &str = "MigrationEvent";

/// Fan-out sink that also retains the run's events for post-run analysis
pub struct TelemetrySink {
    event_log: Arc<dyn EventLog>,
    metrics: Arc<dyn MetricsSink>,
    recorded: Vec<MigrationEvent>,
}

impl TelemetrySink {
    /// Create a sink over the two channels
    pub fn new(event_log: Arc<dyn EventLog>, metrics: Arc<dyn MetricsSink>) -> Self {
        Self {
            event_log,
            metrics,
            recorded: Vec::new(),
        }
    }

    /// Record one event
    ///
    /// The event is always retained in memory; each channel write is
    /// attempted independently so one channel failing cannot suppress the
    /// other.
    pub async fn record(&mut self, event: MigrationEvent) {
        if let Err(e) = self.event_log.append(&event).await {
            tracing::warn!(error = %e, "Durable event log write failed; event retained in memory");
        }
        if let Err(e) = self.metrics.track_event(METRIC_EVENT_NAME, &event).await {
            tracing::warn!(error = %e, "Metrics sink write failed");
        }
        self.recorded.push(event);
    }

    /// Every event recorded during the run, in order
    pub fn events(&self) -> &[MigrationEvent] {
        &self.recorded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{MemoryEventLog, MemoryMetricsSink};
    use crate::domain::EventKind;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_event_reaches_both_channels() {
        let log = Arc::new(MemoryEventLog::new());
        let metrics = Arc::new(MemoryMetricsSink::new());
        let mut sink = TelemetrySink::new(log.clone(), metrics.clone());

        let run_id = Uuid::new_v4();
        sink.record(MigrationEvent::batch(run_id, 100, 42)).await;

        assert_eq!(sink.events().len(), 1);
        assert_eq!(log.events().len(), 1);
        let tracked = metrics.tracked();
        assert_eq!(tracked.len(), 1);
        assert_eq!(tracked[0].0, "MigrationEvent");
    }

    #[tokio::test]
    async fn test_metrics_failure_does_not_block_log() {
        let log = Arc::new(MemoryEventLog::new());
        let metrics = Arc::new(MemoryMetricsSink::new());
        metrics.fail_tracking();
        let mut sink = TelemetrySink::new(log.clone(), metrics.clone());

        let run_id = Uuid::new_v4();
        for i in 0..5 {
            sink.record(MigrationEvent::batch(run_id, i, i as u64)).await;
        }

        assert_eq!(log.events().len(), 5);
        assert!(metrics.tracked().is_empty());
        assert_eq!(sink.events().len(), 5);
    }

    #[tokio::test]
    async fn test_log_failure_does_not_block_metrics() {
        let log = Arc::new(MemoryEventLog::new());
        log.fail_appends();
        let metrics = Arc::new(MemoryMetricsSink::new());
        let mut sink = TelemetrySink::new(log.clone(), metrics.clone());

        sink.record(MigrationEvent::fatal(Uuid::new_v4(), "boom"))
            .await;

        assert!(log.events().is_empty());
        assert_eq!(metrics.tracked().len(), 1);
        assert_eq!(sink.events()[0].kind, EventKind::Fatal);
    }
}
