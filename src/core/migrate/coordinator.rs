//! Migration coordinator - main orchestrator of a run
//!
//! A single driver of control: collections are migrated strictly
//! sequentially (a collection finishes its retries before the next one
//! starts), and all shared mutable state lives in one
//! [`MigrationRunContext`] owned by the driver. Concurrency exists only
//! inside a batch, behind the pool; its results are folded back into the
//! context after the whole batch settles, so no locking is needed.

use crate::adapters::{DestinationStore, EventLog, MetricsSink, SnapshotStore, SourceStore};
use crate::config::CaravanConfig;
use crate::core::analyze::EfficiencyAnalyzer;
use crate::core::migrate::batcher::{BatchController, BatchSignal};
use crate::core::migrate::pool::{BatchOutcome, ConcurrencyPool};
use crate::core::migrate::retry::{FailureQueue, RetryScheduler};
use crate::core::migrate::summary::{CollectionOutcome, MigrationSummary};
use crate::core::snapshot::SnapshotManager;
use crate::domain::{FatalError, MigrationEvent, Record, RecordKind, Result};
use crate::telemetry::TelemetrySink;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use uuid::Uuid;

/// Phase of the run state machine
///
/// `Failed` is reachable only from `Backup` and `Pull`; errors inside
/// `Migrate`/`Retry` are recorded and the run still reaches `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Init,
    Backup,
    Pull,
    Migrate,
    Retry,
    Analyze,
    Done,
    Failed,
}

/// All mutable run state, owned by the driver and passed explicitly
pub struct MigrationRunContext {
    /// Run identity, stamped on every telemetry event
    pub run_id: Uuid,
    batcher: BatchController,
    failures: FailureQueue,
    telemetry: TelemetrySink,
    summary: MigrationSummary,
}

impl MigrationRunContext {
    fn new(run_id: Uuid, batcher: BatchController, telemetry: TelemetrySink) -> Self {
        Self {
            run_id,
            batcher,
            failures: FailureQueue::new(),
            telemetry,
            summary: MigrationSummary::new(run_id),
        }
    }

    /// Current batch size, exposed for assertions and progress output
    pub fn batch_size(&self) -> usize {
        self.batcher.current()
    }
}

/// Orchestrates backup, pull, adaptive-batch migration, retries and the
/// post-run analysis
pub struct MigrationCoordinator {
    snapshots: SnapshotManager,
    source: Arc<dyn SourceStore>,
    pool: ConcurrencyPool,
    scheduler: RetryScheduler,
    analyzer: EfficiencyAnalyzer,
    event_log: Arc<dyn EventLog>,
    metrics: Arc<dyn MetricsSink>,
    config: CaravanConfig,
    phase: RunPhase,
}

impl MigrationCoordinator {
    /// Create a coordinator over the given stores and sinks
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the batch bounds are invalid.
    pub fn new(
        config: CaravanConfig,
        source: Arc<dyn SourceStore>,
        destination: Arc<dyn DestinationStore>,
        snapshot_store: Arc<dyn SnapshotStore>,
        event_log: Arc<dyn EventLog>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Result<Self> {
        // Bounds are validated again here so a coordinator built from a
        // hand-assembled config is still safe.
        BatchController::new(
            config.migration.batch_min,
            config.migration.batch_initial,
            config.migration.batch_max,
        )?;

        let pool = ConcurrencyPool::new(
            destination,
            config.migration.concurrency,
            config.migration.upsert_timeout(),
        );
        let scheduler = RetryScheduler::new(
            config.migration.max_retry_rounds,
            config.migration.retry_base_delay(),
        );
        let analyzer = EfficiencyAnalyzer::new(config.analysis.slow_batch_multiplier);
        let snapshots = SnapshotManager::new(source.clone(), snapshot_store);

        Ok(Self {
            snapshots,
            source,
            pool,
            scheduler,
            analyzer,
            event_log,
            metrics,
            config,
            phase: RunPhase::Init,
        })
    }

    /// Phase the last (or current) run reached
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Execute a full migration run
    ///
    /// Backs up every collection first, then migrates each collection to
    /// completion (primary pass plus retry rounds) in order, then runs the
    /// efficiency analysis. Only backup and pull failures abort the run.
    ///
    /// # Errors
    ///
    /// Returns the fatal error if backup or pull fails; the process maps
    /// this to a non-zero exit.
    pub async fn execute(
        &mut self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<MigrationSummary> {
        let start = Instant::now();
        let run_id = Uuid::new_v4();
        let batcher = BatchController::new(
            self.config.migration.batch_min,
            self.config.migration.batch_initial,
            self.config.migration.batch_max,
        )?;
        let telemetry = TelemetrySink::new(self.event_log.clone(), self.metrics.clone());
        let mut ctx = MigrationRunContext::new(run_id, batcher, telemetry);

        tracing::info!(run_id = %run_id, "Starting migration run");

        // Backup phase: every collection is vaulted before any destination
        // mutation occurs.
        self.phase = RunPhase::Backup;
        let mut snapshot_ids = Vec::new();
        for kind in RecordKind::ALL {
            match self.snapshots.backup(kind).await {
                Ok(snapshot_id) => snapshot_ids.push(snapshot_id),
                Err(fatal) => return self.abort(&mut ctx, fatal).await,
            }
        }

        for (kind, snapshot_id) in RecordKind::ALL.into_iter().zip(snapshot_ids) {
            // Pull phase: the full collection comes into memory.
            self.phase = RunPhase::Pull;
            tracing::info!(collection = %kind, "Pulling collection from source");
            let records = match self.source.list_all(kind).await {
                Ok(records) => records,
                Err(message) => {
                    let fatal = FatalError::SourceRead {
                        collection: kind.collection().to_string(),
                        message,
                    };
                    return self.abort(&mut ctx, fatal).await;
                }
            };
            let pulled = records.len();

            tracing::info!(
                collection = %kind,
                records = pulled,
                batch_size = ctx.batch_size(),
                "Pushing to destination"
            );

            self.phase = RunPhase::Migrate;
            let mut migrated = self.run_pass(&mut ctx, records, &mut shutdown).await;

            self.phase = RunPhase::Retry;
            migrated += self.drain_retries(&mut ctx, &mut shutdown).await;

            tracing::info!(collection = %kind, migrated, pulled, "Collection migrated");
            ctx.summary.collections.push(CollectionOutcome {
                kind,
                pulled,
                migrated,
                snapshot_id,
            });
        }

        self.phase = RunPhase::Analyze;
        let report = self.analyzer.analyze(ctx.telemetry.events());
        if !report.advisories.is_empty() {
            tracing::warn!(
                slow_batches = report.advisories.len(),
                mean_ms = report.mean_duration_ms,
                "Slow batches flagged by efficiency analysis"
            );
        }
        ctx.summary.advisories = Some(report);

        self.phase = RunPhase::Done;
        let summary = ctx.summary.with_duration(start.elapsed());
        summary.log_summary();
        Ok(summary)
    }

    /// Record the fatal, mark the run failed and bubble the error up
    async fn abort(
        &mut self,
        ctx: &mut MigrationRunContext,
        fatal: FatalError,
    ) -> Result<MigrationSummary> {
        self.phase = RunPhase::Failed;
        tracing::error!(error = %fatal, collection = fatal.collection(), "Migration run aborted");
        ctx.telemetry
            .record(MigrationEvent::fatal(ctx.run_id, fatal.to_string()))
            .await;
        Err(fatal.into())
    }

    /// One migration pass over `records`: slice, write, adapt, requeue
    ///
    /// Rate-limit shrink applies immediately, so later slices in this pass
    /// already use the reduced size; growth is applied once at the end of
    /// a pass in which every batch fully succeeded. Returns the number of
    /// records written.
    async fn run_pass(
        &self,
        ctx: &mut MigrationRunContext,
        records: Vec<Record>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> usize {
        let mut migrated = 0;
        let mut offset = 0;
        let mut clean = true;

        while offset < records.len() {
            if *shutdown.borrow() {
                let remaining = records.len() - offset;
                tracing::warn!(remaining, "Shutdown requested; stopping at batch boundary");
                ctx.summary.skipped += remaining;
                return migrated;
            }

            let batch = ctx.batcher.next_batch(&records, offset).to_vec();
            let used = batch.len();

            let batch_start = Instant::now();
            let outcome = self.pool.write_batch(batch).await;
            let duration_ms = batch_start.elapsed().as_millis() as u64;

            ctx.telemetry
                .record(MigrationEvent::batch(ctx.run_id, used, duration_ms))
                .await;
            if !outcome.is_full_success() {
                ctx.telemetry
                    .record(MigrationEvent::error(
                        ctx.run_id,
                        used,
                        duration_ms,
                        summarize_failures(&outcome),
                    ))
                    .await;
            }

            migrated += outcome.succeeded.len();

            if outcome.saw_rate_limit() {
                ctx.batcher.on_batch_result(BatchSignal::RateLimited);
                clean = false;
                tracing::warn!(
                    batch_size = used,
                    next_batch_size = ctx.batch_size(),
                    "Destination rate-limited the batch; backing off"
                );
            } else if !outcome.is_full_success() {
                clean = false;
            }

            for failed in outcome.failed {
                tracing::debug!(
                    record_id = %failed.record.id,
                    collection = %failed.record.kind,
                    error = %failed.error,
                    "Record requeued for retry"
                );
                ctx.failures.push(failed.record);
            }

            offset += used;
        }

        if clean && offset > 0 {
            ctx.batcher.on_batch_result(BatchSignal::Success);
        }

        migrated
    }

    /// Drain the failure queue in bounded backoff rounds
    ///
    /// Each round resubmits the whole queue as a fresh pass, grouped and
    /// routed by every record's own kind. Whatever survives the last round
    /// goes into the summary as permanently failed.
    async fn drain_retries(
        &self,
        ctx: &mut MigrationRunContext,
        shutdown: &mut watch::Receiver<bool>,
    ) -> usize {
        let mut migrated = 0;

        for round in 0..self.scheduler.max_rounds() {
            if ctx.failures.is_empty() || *shutdown.borrow() {
                break;
            }
            tracing::info!(
                round,
                pending = ctx.failures.len(),
                "Retrying failed records"
            );
            self.scheduler.wait_before(round).await;

            let groups = ctx.failures.drain_by_kind();
            for (_, (_, records)) in groups {
                migrated += self.run_pass(ctx, records, shutdown).await;
            }
        }

        if *shutdown.borrow() && !ctx.failures.is_empty() {
            // Shutdown cut the rounds short; these were not retried to the
            // cap, so they count as skipped rather than permanently failed.
            ctx.summary.skipped += ctx.failures.len();
            ctx.failures.drain();
            return migrated;
        }

        for record in ctx.failures.drain() {
            tracing::error!(
                record_id = %record.id,
                collection = %record.kind,
                "Record failed permanently after exhausting retries"
            );
            ctx.summary.permanently_failed.push(record.id);
        }

        migrated
    }
}

fn summarize_failures(outcome: &BatchOutcome) -> String {
    let total = outcome.succeeded.len() + outcome.failed.len();
    match outcome.failed.first() {
        Some(first) => format!(
            "{} of {} records failed (first: {} - {})",
            outcome.failed.len(),
            total,
            first.record.id,
            first.error
        ),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        MemoryDestination, MemoryEventLog, MemoryMetricsSink, MemorySnapshotStore, MemorySource,
    };
    use crate::config::schema::{
        AnalysisConfig, ApplicationConfig, LoggingConfig, MigrationConfig, StoreConfig,
        TelemetryConfig,
    };

    pub(crate) fn test_config() -> CaravanConfig {
        CaravanConfig {
            application: ApplicationConfig::default(),
            source: StoreConfig {
                path: "unused".to_string(),
            },
            destination: StoreConfig {
                path: "unused".to_string(),
            },
            snapshot: StoreConfig {
                path: "unused".to_string(),
            },
            migration: MigrationConfig::default(),
            analysis: AnalysisConfig::default(),
            telemetry: TelemetryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    fn harness(
        config: CaravanConfig,
    ) -> (
        MigrationCoordinator,
        Arc<MemorySource>,
        Arc<MemoryDestination>,
        Arc<MemoryEventLog>,
    ) {
        let source = Arc::new(MemorySource::new());
        let destination = Arc::new(MemoryDestination::new());
        let snapshot_store = Arc::new(MemorySnapshotStore::new());
        let event_log = Arc::new(MemoryEventLog::new());
        let metrics = Arc::new(MemoryMetricsSink::new());
        let coordinator = MigrationCoordinator::new(
            config,
            source.clone(),
            destination.clone(),
            snapshot_store,
            event_log.clone(),
            metrics,
        )
        .unwrap();
        (coordinator, source, destination, event_log)
    }

    fn seed(source: &MemorySource, kind: RecordKind, n: usize) {
        let prefix = match kind {
            RecordKind::User => "u",
            RecordKind::Transaction => "tx",
        };
        source.seed(
            kind,
            (0..n)
                .map(|i| Record::new(format!("{prefix}-{i}"), kind))
                .collect(),
        );
    }

    #[tokio::test]
    async fn test_clean_run_reaches_done() {
        let (mut coordinator, source, destination, _) = harness(test_config());
        seed(&source, RecordKind::User, 30);
        seed(&source, RecordKind::Transaction, 20);

        let (_tx, rx) = watch::channel(false);
        let summary = coordinator.execute(rx).await.unwrap();

        assert_eq!(coordinator.phase(), RunPhase::Done);
        assert_eq!(summary.total_migrated(), 50);
        assert!(summary.permanently_failed.is_empty());
        assert_eq!(destination.count(RecordKind::User), 30);
        assert_eq!(destination.count(RecordKind::Transaction), 20);
    }

    #[tokio::test]
    async fn test_backup_failure_is_fatal() {
        let (mut coordinator, source, destination, event_log) = harness(test_config());
        source.fail_reads();

        let (_tx, rx) = watch::channel(false);
        let err = coordinator.execute(rx).await.unwrap_err();

        assert!(matches!(err, crate::domain::CaravanError::Fatal(_)));
        assert_eq!(coordinator.phase(), RunPhase::Failed);
        // no destination mutation happened
        assert_eq!(destination.count(RecordKind::User), 0);
        // the fatal event reached the durable log
        assert!(event_log
            .events()
            .iter()
            .any(|e| e.kind == crate::domain::EventKind::Fatal));
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_failures_do_not_fail_the_run() {
        let config = {
            let mut c = test_config();
            c.migration.retry_base_delay_ms = 10;
            c
        };
        let (mut coordinator, source, destination, _) = harness(config);
        seed(&source, RecordKind::User, 10);
        destination.fail_always("u-3");

        let (_tx, rx) = watch::channel(false);
        let summary = coordinator.execute(rx).await.unwrap();

        assert_eq!(coordinator.phase(), RunPhase::Done);
        assert_eq!(summary.permanently_failed.len(), 1);
        assert_eq!(summary.permanently_failed[0].as_str(), "u-3");
        assert_eq!(summary.total_migrated(), 9);
    }

    #[tokio::test]
    async fn test_shutdown_stops_at_batch_boundary() {
        let config = {
            let mut c = test_config();
            c.migration.batch_initial = 10;
            c.migration.batch_max = 10;
            c
        };
        let (mut coordinator, source, _, _) = harness(config);
        seed(&source, RecordKind::User, 50);

        let (tx, rx) = watch::channel(true); // already requested
        let summary = coordinator.execute(rx).await.unwrap();
        drop(tx);

        assert_eq!(coordinator.phase(), RunPhase::Done);
        assert_eq!(summary.total_migrated(), 0);
        assert_eq!(summary.skipped, 50);
    }
}
