//! In-memory store adapters
//!
//! Used by the test suite. The destination supports failure injection
//! (rate-limit budgets, per-id failure scripts) and counts attempts per
//! record id so tests can assert retry behavior.

use crate::domain::{MigrationEvent, Record, RecordId, RecordKind, TelemetryError, UpsertError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::traits::{DestinationStore, EventLog, MetricsSink, SnapshotStore, SourceStore};

/// In-memory source store
#[derive(Default)]
pub struct MemorySource {
    collections: Mutex<HashMap<RecordKind, Vec<Record>>>,
    fail_reads: AtomicBool,
}

impl MemorySource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents of a collection
    pub fn seed(&self, kind: RecordKind, records: Vec<Record>) {
        self.collections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(kind, records);
    }

    /// Make every subsequent read fail
    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    /// Current contents of a collection
    pub fn contents(&self, kind: RecordKind) -> Vec<Record> {
        self.collections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl SourceStore for MemorySource {
    async fn list_all(&self, kind: RecordKind) -> Result<Vec<Record>, String> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err("injected source read failure".to_string());
        }
        Ok(self.contents(kind))
    }

    async fn put_all(&self, kind: RecordKind, records: &[Record]) -> Result<(), String> {
        let mut collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        let existing = collections.entry(kind).or_default();
        existing.retain(|r| !records.iter().any(|n| n.id == r.id));
        existing.extend_from_slice(records);
        Ok(())
    }
}

/// In-memory destination store with failure injection
#[derive(Default)]
pub struct MemoryDestination {
    records: Mutex<HashMap<(RecordKind, RecordId), Record>>,
    attempts: Mutex<HashMap<RecordId, usize>>,
    /// Number of upcoming calls to reject with `RateLimited`
    rate_limit_budget: AtomicUsize,
    /// Ids that fail on every attempt
    always_fail: Mutex<Vec<RecordId>>,
    /// Ids that fail their first n attempts, then succeed
    fail_first: Mutex<HashMap<RecordId, usize>>,
    /// Artificial per-call latency in milliseconds
    latency_ms: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryDestination {
    /// Create an empty destination
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `n` upsert calls with a rate-limit signal
    pub fn rate_limit_next(&self, n: usize) {
        self.rate_limit_budget.store(n, Ordering::SeqCst);
    }

    /// Fail every attempt for `id`
    pub fn fail_always(&self, id: impl Into<RecordId>) {
        self.always_fail
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(id.into());
    }

    /// Fail the first `n` attempts for `id`, then succeed
    pub fn fail_first(&self, id: impl Into<RecordId>, n: usize) {
        self.fail_first
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.into(), n);
    }

    /// Add artificial latency to each call, to force overlap in tests
    pub fn set_latency_ms(&self, ms: usize) {
        self.latency_ms.store(ms, Ordering::SeqCst);
    }

    /// Attempts observed for `id`
    pub fn attempts(&self, id: &RecordId) -> usize {
        self.attempts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .copied()
            .unwrap_or(0)
    }

    /// Highest number of simultaneously in-flight calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Whether `id` was stored in the collection for `kind`
    pub fn contains(&self, kind: RecordKind, id: &RecordId) -> bool {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&(kind, id.clone()))
    }

    /// Number of stored records for `kind`
    pub fn count(&self, kind: RecordKind) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .filter(|(k, _)| *k == kind)
            .count()
    }
}

#[async_trait]
impl DestinationStore for MemoryDestination {
    async fn upsert(&self, record: &Record) -> Result<(), UpsertError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(latency as u64)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let attempt = {
            let mut attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
            let counter = attempts.entry(record.id.clone()).or_insert(0);
            *counter += 1;
            *counter
        };

        // Rate-limit budget is consumed call by call.
        loop {
            let budget = self.rate_limit_budget.load(Ordering::SeqCst);
            if budget == 0 {
                break;
            }
            if self
                .rate_limit_budget
                .compare_exchange(budget, budget - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return Err(UpsertError::RateLimited);
            }
        }

        if self
            .always_fail
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&record.id)
        {
            return Err(UpsertError::Other("injected permanent failure".to_string()));
        }

        if let Some(n) = self
            .fail_first
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&record.id)
            .copied()
        {
            if attempt <= n {
                return Err(UpsertError::Other(format!(
                    "injected failure {attempt}/{n}"
                )));
            }
        }

        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((record.kind, record.id.clone()), record.clone());
        Ok(())
    }
}

/// In-memory snapshot store
#[derive(Default)]
pub struct MemorySnapshotStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
}

impl MemorySnapshotStore {
    /// Create an empty snapshot store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    /// Number of snapshots held
    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether no snapshots are held
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), String> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err("injected snapshot write failure".to_string());
        }
        let mut blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        if blobs.contains_key(key) {
            return Err(format!("snapshot key already exists: {key}"));
        }
        blobs.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, String> {
        self.blobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
            .ok_or_else(|| format!("snapshot not found: {key}"))
    }
}

/// In-memory durable event log, optionally failing
#[derive(Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<MigrationEvent>>,
    fail: AtomicBool,
}

impl MemoryEventLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent append fail
    pub fn fail_appends(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Events appended so far
    pub fn events(&self) -> Vec<MigrationEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl EventLog for MemoryEventLog {
    async fn append(&self, event: &MigrationEvent) -> Result<(), TelemetryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(TelemetryError::new("event-log", "injected log failure"));
        }
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
        Ok(())
    }
}

/// In-memory metrics sink, optionally failing
#[derive(Default)]
pub struct MemoryMetricsSink {
    tracked: Mutex<Vec<(String, MigrationEvent)>>,
    fail: AtomicBool,
}

impl MemoryMetricsSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent track call fail
    pub fn fail_tracking(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Events tracked so far
    pub fn tracked(&self) -> Vec<(String, MigrationEvent)> {
        self.tracked
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl MetricsSink for MemoryMetricsSink {
    async fn track_event(&self, name: &str, event: &MigrationEvent) -> Result<(), TelemetryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(TelemetryError::new("metrics", "injected metrics failure"));
        }
        self.tracked
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((name.to_string(), event.clone()));
        Ok(())
    }
}
