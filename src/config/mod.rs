//! Configuration management
//!
//! TOML-based configuration with `${VAR}` environment substitution,
//! `CARAVAN_*` environment overrides and validation. The configuration is
//! constructed once at startup and passed down; components never read the
//! environment themselves.
//!
//! # Example configuration
//!
//! ```toml
//! [application]
//! name = "caravan"
//! log_level = "info"
//!
//! [source]
//! path = "./data/source"
//!
//! [destination]
//! path = "./data/destination"
//!
//! [snapshot]
//! path = "./data/snapshots"
//!
//! [migration]
//! batch_min = 10
//! batch_initial = 100
//! batch_max = 1000
//! concurrency = 20
//! max_retry_rounds = 5
//! ```

pub mod loader;
pub mod schema;

pub use loader::load_config;
pub use schema::{
    AnalysisConfig, ApplicationConfig, CaravanConfig, LoggingConfig, MigrationConfig, StoreConfig,
    TelemetryConfig,
};
