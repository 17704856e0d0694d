//! Migrate command implementation
//!
//! This module implements the `migrate` command for moving every collection
//! from the source store to the destination store.

use crate::adapters::fs::{
    DirSnapshotStore, JsonDirDestination, JsonDirSource, JsonlEventLog, TracingMetricsSink,
};
use crate::config::load_config;
use crate::core::migrate::MigrationCoordinator;
use crate::domain::CaravanError;
use clap::Args;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Override the initial batch size
    #[arg(long)]
    pub batch_initial: Option<usize>,

    /// Override the in-flight write ceiling
    #[arg(long)]
    pub concurrency: Option<usize>,
}

impl MigrateArgs {
    /// Execute the migrate command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting migrate command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
        };

        if let Some(batch_initial) = self.batch_initial {
            tracing::info!(batch_initial, "Overriding initial batch size from CLI");
            config.migration.batch_initial = batch_initial;
        }

        if let Some(concurrency) = self.concurrency {
            tracing::info!(concurrency, "Overriding concurrency from CLI");
            config.migration.concurrency = concurrency;
        }

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        if !self.yes {
            println!("Migration Configuration:");
            println!("  Source: {}", config.source.path);
            println!("  Destination: {}", config.destination.path);
            println!("  Snapshots: {}", config.snapshot.path);
            println!(
                "  Batch size: {} (bounds {}..={})",
                config.migration.batch_initial,
                config.migration.batch_min,
                config.migration.batch_max
            );
            println!("  Concurrency: {}", config.migration.concurrency);
            println!();
            print!("Proceed with migration? [y/N]: ");
            use std::io::{self, Write};
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Migration cancelled.");
                return Ok(0);
            }
        }

        let source = Arc::new(JsonDirSource::new(&config.source.path));
        let destination = Arc::new(JsonDirDestination::new(&config.destination.path));
        let snapshot_store = Arc::new(DirSnapshotStore::new(&config.snapshot.path));
        let event_log = Arc::new(JsonlEventLog::new(&config.telemetry.event_log_path));
        let metrics = Arc::new(TracingMetricsSink);

        let mut coordinator = MigrationCoordinator::new(
            config,
            source,
            destination,
            snapshot_store,
            event_log,
            metrics,
        )?;

        match coordinator.execute(shutdown_signal).await {
            Ok(summary) => {
                println!("{}", summary.render());
                Ok(0)
            }
            Err(CaravanError::Fatal(fatal)) => {
                tracing::error!(error = %fatal, "Migration aborted");
                eprintln!("Migration aborted: {fatal}");
                Ok(1)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_args_defaults() {
        let args = MigrateArgs {
            yes: false,
            batch_initial: None,
            concurrency: None,
        };
        assert!(!args.yes);
        assert!(args.batch_initial.is_none());
    }
}
