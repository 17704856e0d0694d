//! Configuration loader with TOML parsing and environment overrides

use super::schema::CaravanConfig;
use crate::domain::{CaravanError, Result};
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into [`CaravanConfig`]
/// 4. Applies `CARAVAN_*` environment overrides
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if the file cannot be read, a referenced environment
/// variable is missing, parsing fails, or validation fails.
pub fn load_config(path: impl AsRef<Path>) -> Result<CaravanConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(CaravanError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        CaravanError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: CaravanConfig = toml::from_str(&contents)
        .map_err(|e| CaravanError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config);

    config.validate()?;

    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are left untouched. Referencing an unset variable is an
/// error listing every missing name.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap_or_else(|_| unreachable!());
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{var_name}}}");
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(CaravanError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment overrides using the `CARAVAN_<SECTION>_<KEY>` pattern
fn apply_env_overrides(config: &mut CaravanConfig) {
    if let Ok(val) = std::env::var("CARAVAN_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("CARAVAN_SOURCE_PATH") {
        config.source.path = val;
    }
    if let Ok(val) = std::env::var("CARAVAN_DESTINATION_PATH") {
        config.destination.path = val;
    }
    if let Ok(val) = std::env::var("CARAVAN_SNAPSHOT_PATH") {
        config.snapshot.path = val;
    }
    if let Ok(val) = std::env::var("CARAVAN_MIGRATION_BATCH_INITIAL") {
        if let Ok(size) = val.parse() {
            config.migration.batch_initial = size;
        }
    }
    if let Ok(val) = std::env::var("CARAVAN_MIGRATION_CONCURRENCY") {
        if let Ok(concurrency) = val.parse() {
            config.migration.concurrency = concurrency;
        }
    }
    if let Ok(val) = std::env::var("CARAVAN_MIGRATION_MAX_RETRY_ROUNDS") {
        if let Ok(rounds) = val.parse() {
            config.migration.max_retry_rounds = rounds;
        }
    }
    if let Ok(val) = std::env::var("CARAVAN_TELEMETRY_EVENT_LOG_PATH") {
        config.telemetry.event_log_path = val;
    }
    if let Ok(val) = std::env::var("CARAVAN_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("CARAVAN_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}
