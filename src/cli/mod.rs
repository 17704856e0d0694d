//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Caravan using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Caravan - adaptive-batch document store migration tool
#[derive(Parser, Debug)]
#[command(name = "caravan")]
#[command(version, about, long_about = None)]
#[command(author = "Caravan Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "caravan.toml", env = "CARAVAN_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "CARAVAN_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Migrate every collection from the source store to the destination
    Migrate(commands::migrate::MigrateArgs),

    /// Restore a collection into the source store from a snapshot
    Restore(commands::restore::RestoreArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),
}
