//! Configuration schema and validation

use crate::domain::{CaravanError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaravanConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Source store location
    pub source: StoreConfig,
    /// Destination store location
    pub destination: StoreConfig,
    /// Snapshot store location
    pub snapshot: StoreConfig,
    /// Engine thresholds
    #[serde(default)]
    pub migration: MigrationConfig,
    /// Post-run analysis settings
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Telemetry channel settings
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name used in logs
    #[serde(default = "default_app_name")]
    pub name: String,
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
        }
    }
}

/// Location of one store (a directory for the filesystem backends)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root path of the store
    pub path: String,
}

/// Engine thresholds
///
/// Value ranges are enforced by [`CaravanConfig::validate`]:
/// `1 <= batch_min <= batch_initial <= batch_max <= 100_000`,
/// `1 <= concurrency <= 500`, `max_retry_rounds <= 10`,
/// `retry_base_delay_ms >= 1`, `upsert_timeout_ms >= 100`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Smallest batch the controller will shrink to
    #[serde(default = "default_batch_min")]
    pub batch_min: usize,
    /// Batch size at the start of a run
    #[serde(default = "default_batch_initial")]
    pub batch_initial: usize,
    /// Largest batch the controller will grow to
    #[serde(default = "default_batch_max")]
    pub batch_max: usize,
    /// Ceiling on simultaneous in-flight destination writes
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Retry rounds after the primary pass; round k backs off 2^k units
    #[serde(default = "default_max_retry_rounds")]
    pub max_retry_rounds: u32,
    /// One backoff time unit, in milliseconds
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// Per-destination-call timeout, in milliseconds
    #[serde(default = "default_upsert_timeout_ms")]
    pub upsert_timeout_ms: u64,
}

impl MigrationConfig {
    /// Backoff time unit as a duration
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// Per-call timeout as a duration
    pub fn upsert_timeout(&self) -> Duration {
        Duration::from_millis(self.upsert_timeout_ms)
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            batch_min: default_batch_min(),
            batch_initial: default_batch_initial(),
            batch_max: default_batch_max(),
            concurrency: default_concurrency(),
            max_retry_rounds: default_max_retry_rounds(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            upsert_timeout_ms: default_upsert_timeout_ms(),
        }
    }
}

/// Post-run analysis settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// A batch slower than `multiplier x mean` is flagged; must be > 0
    #[serde(default = "default_slow_batch_multiplier")]
    pub slow_batch_multiplier: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            slow_batch_multiplier: default_slow_batch_multiplier(),
        }
    }
}

/// Telemetry channel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Path of the durable JSONL event log
    #[serde(default = "default_event_log_path")]
    pub event_log_path: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            event_log_path: default_event_log_path(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable rotating JSON file logs in addition to the console
    #[serde(default)]
    pub local_enabled: bool,
    /// Directory for file logs
    #[serde(default = "default_log_path")]
    pub local_path: String,
    /// Rotation: "daily" or "hourly"
    #[serde(default = "default_log_rotation")]
    pub local_rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_log_path(),
            local_rotation: default_log_rotation(),
        }
    }
}

fn default_app_name() -> String {
    "caravan".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_batch_min() -> usize {
    10
}
fn default_batch_initial() -> usize {
    100
}
fn default_batch_max() -> usize {
    1000
}
fn default_concurrency() -> usize {
    20
}
fn default_max_retry_rounds() -> u32 {
    5
}
fn default_retry_base_delay_ms() -> u64 {
    1000
}
fn default_upsert_timeout_ms() -> u64 {
    30_000
}
fn default_slow_batch_multiplier() -> f64 {
    2.0
}
fn default_event_log_path() -> String {
    "./caravan-events.jsonl".to_string()
}
fn default_log_path() -> String {
    "./logs".to_string()
}
fn default_log_rotation() -> String {
    "daily".to_string()
}

impl CaravanConfig {
    /// Validate field ranges
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        let m = &self.migration;
        if m.batch_min == 0 {
            return Err(invalid("migration.batch_min must be >= 1"));
        }
        if m.batch_min > m.batch_initial || m.batch_initial > m.batch_max {
            return Err(invalid(
                "migration batch bounds must satisfy batch_min <= batch_initial <= batch_max",
            ));
        }
        if m.batch_max > 100_000 {
            return Err(invalid("migration.batch_max must be <= 100000"));
        }
        if m.concurrency == 0 || m.concurrency > 500 {
            return Err(invalid("migration.concurrency must be in 1..=500"));
        }
        if m.max_retry_rounds > 10 {
            return Err(invalid("migration.max_retry_rounds must be <= 10"));
        }
        if m.retry_base_delay_ms == 0 {
            return Err(invalid("migration.retry_base_delay_ms must be >= 1"));
        }
        if m.upsert_timeout_ms < 100 {
            return Err(invalid("migration.upsert_timeout_ms must be >= 100"));
        }
        if self.analysis.slow_batch_multiplier <= 0.0 {
            return Err(invalid("analysis.slow_batch_multiplier must be > 0"));
        }
        for (section, store) in [
            ("source", &self.source),
            ("destination", &self.destination),
            ("snapshot", &self.snapshot),
        ] {
            if store.path.trim().is_empty() {
                return Err(invalid(&format!("{section}.path must not be empty")));
            }
        }
        match self.application.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(invalid(&format!(
                    "application.log_level '{other}' is not one of trace, debug, info, warn, error"
                )))
            }
        }
        Ok(())
    }
}

fn invalid(message: &str) -> CaravanError {
    CaravanError::Configuration(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CaravanConfig {
        CaravanConfig {
            application: ApplicationConfig::default(),
            source: StoreConfig {
                path: "./src-data".to_string(),
            },
            destination: StoreConfig {
                path: "./dst-data".to_string(),
            },
            snapshot: StoreConfig {
                path: "./snaps".to_string(),
            },
            migration: MigrationConfig::default(),
            analysis: AnalysisConfig::default(),
            telemetry: TelemetryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(config().validate().is_ok());
        let m = MigrationConfig::default();
        assert_eq!(m.batch_min, 10);
        assert_eq!(m.batch_initial, 100);
        assert_eq!(m.batch_max, 1000);
        assert_eq!(m.concurrency, 20);
        assert_eq!(m.max_retry_rounds, 5);
    }

    #[test]
    fn test_batch_bounds_validation() {
        let mut cfg = config();
        cfg.migration.batch_min = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = config();
        cfg.migration.batch_initial = 5;
        assert!(cfg.validate().is_err());

        let mut cfg = config();
        cfg.migration.batch_max = 50;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_concurrency_validation() {
        let mut cfg = config();
        cfg.migration.concurrency = 0;
        assert!(cfg.validate().is_err());
        cfg.migration.concurrency = 501;
        assert!(cfg.validate().is_err());
        cfg.migration.concurrency = 500;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_retry_and_analysis_validation() {
        let mut cfg = config();
        cfg.migration.max_retry_rounds = 11;
        assert!(cfg.validate().is_err());

        let mut cfg = config();
        cfg.analysis.slow_batch_multiplier = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_empty_store_path_rejected() {
        let mut cfg = config();
        cfg.destination.path = "  ".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_log_level_validation() {
        let mut cfg = config();
        cfg.application.log_level = "verbose".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_minimal_toml_parses_with_defaults() {
        let cfg: CaravanConfig = toml::from_str(
            r#"
[source]
path = "./a"

[destination]
path = "./b"

[snapshot]
path = "./c"
"#,
        )
        .unwrap();
        assert_eq!(cfg.migration.batch_initial, 100);
        assert_eq!(cfg.analysis.slow_batch_multiplier, 2.0);
        assert!(cfg.validate().is_ok());
    }
}
