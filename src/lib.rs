// Caravan - adaptive-batch document store migration tool
// Copyright (c) 2025 Caravan Contributors
// Licensed under the MIT License

//! # Caravan - adaptive-batch document store migration
//!
//! Caravan moves the `users` and `transactions` collections from a source
//! document store into a destination store. Batch sizes adapt to destination
//! feedback: clean passes grow the batch, rate-limit pushback shrinks it.
//! Every collection is snapshotted before any write, failed records are
//! retried with exponential backoff, and each run ends with a timing
//! analysis of the recorded batch events.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (migrate, snapshot, analyze)
//! - [`adapters`] - Store backends (filesystem, in-memory)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`telemetry`] - Dual-channel migration event recording
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use caravan::adapters::fs::{
//!     DirSnapshotStore, JsonDirDestination, JsonDirSource, JsonlEventLog, TracingMetricsSink,
//! };
//! use caravan::config::load_config;
//! use caravan::core::migrate::MigrationCoordinator;
//! use std::sync::Arc;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("caravan.toml")?;
//!
//!     let mut coordinator = MigrationCoordinator::new(
//!         config.clone(),
//!         Arc::new(JsonDirSource::new(&config.source.path)),
//!         Arc::new(JsonDirDestination::new(&config.destination.path)),
//!         Arc::new(DirSnapshotStore::new(&config.snapshot.path)),
//!         Arc::new(JsonlEventLog::new(&config.telemetry.event_log_path)),
//!         Arc::new(TracingMetricsSink),
//!     )?;
//!
//!     let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//!     let summary = coordinator.execute(shutdown_rx).await?;
//!
//!     println!("Migrated {} records", summary.total_migrated());
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Caravan uses [`domain::CaravanError`] throughout. Only
//! [`domain::FatalError`] conditions (snapshot or source-read failures)
//! abort a run; individual record failures are queued and retried.
//!
//! ## Logging
//!
//! Caravan uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!("Starting migration");
//! warn!(record_id = "u-42", "Record failed, queued for retry");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
pub mod telemetry;
