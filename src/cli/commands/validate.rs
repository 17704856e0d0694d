//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Caravan configuration file.

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("Validating configuration file: {config_path}");
        println!();

        // load_config validates internally; surface the loaded values on success
        match load_config(config_path) {
            Ok(config) => {
                println!("Configuration is valid");
                println!();
                println!("Configuration Summary:");
                println!("  Application: {}", config.application.name);
                println!("  Log Level: {}", config.application.log_level);
                println!("  Source: {}", config.source.path);
                println!("  Destination: {}", config.destination.path);
                println!("  Snapshots: {}", config.snapshot.path);
                println!(
                    "  Batch bounds: {}..={} (initial {})",
                    config.migration.batch_min,
                    config.migration.batch_max,
                    config.migration.batch_initial
                );
                println!("  Concurrency: {}", config.migration.concurrency);
                println!("  Retry rounds: {}", config.migration.max_retry_rounds);
                println!("  Event log: {}", config.telemetry.event_log_path);
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("Configuration validation failed");
                println!("   Error: {e}");
                println!();
                Ok(2)
            }
        }
    }
}
