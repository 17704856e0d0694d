//! Restore command implementation
//!
//! This module implements the `restore` command for loading a previously
//! taken snapshot back into the source store.

use crate::adapters::fs::{DirSnapshotStore, JsonDirSource};
use crate::config::load_config;
use crate::core::snapshot::SnapshotManager;
use crate::domain::RecordKind;
use clap::Args;
use std::sync::Arc;

/// Arguments for the restore command
#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Collection to restore (users or transactions)
    #[arg(long)]
    pub collection: String,

    /// Snapshot key to restore from
    #[arg(long)]
    pub snapshot: String,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

impl RestoreArgs {
    /// Execute the restore command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(
            collection = %self.collection,
            snapshot = %self.snapshot,
            "Starting restore command"
        );

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
        };

        let Some(kind) = RecordKind::ALL
            .iter()
            .copied()
            .find(|k| k.collection() == self.collection)
        else {
            eprintln!(
                "Unknown collection '{}'. Expected one of: {}",
                self.collection,
                RecordKind::ALL
                    .iter()
                    .map(|k| k.collection())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            return Ok(2);
        };

        if !self.yes {
            println!(
                "Restore will overwrite records in collection '{}' from snapshot '{}'.",
                self.collection, self.snapshot
            );
            print!("Proceed with restore? [y/N]: ");
            use std::io::{self, Write};
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Restore cancelled.");
                return Ok(0);
            }
        }

        let source = Arc::new(JsonDirSource::new(&config.source.path));
        let snapshot_store = Arc::new(DirSnapshotStore::new(&config.snapshot.path));
        let manager = SnapshotManager::new(source, snapshot_store);

        match manager.restore(kind, &self.snapshot).await {
            Ok(count) => {
                tracing::info!(count, collection = %self.collection, "Restore complete");
                println!(
                    "Restored {} record(s) into collection '{}'.",
                    count, self.collection
                );
                Ok(0)
            }
            Err(e) => {
                tracing::error!(error = %e, "Restore failed");
                eprintln!("Restore failed: {e}");
                Ok(1)
            }
        }
    }
}
