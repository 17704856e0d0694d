//! Domain error types
//!
//! All errors are domain-specific and don't expose third-party types.
//! Only `FatalError` aborts a migration run; per-record write failures and
//! telemetry failures are absorbed into the retry/report pipeline.

use thiserror::Error;

/// Main Caravan error type
#[derive(Debug, Error)]
pub enum CaravanError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unrecoverable errors that abort the run before or during backup/pull
    #[error(transparent)]
    Fatal(#[from] FatalError),

    /// Snapshot read/verify errors outside the backup path (restore command)
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Source store errors outside the backup/pull path (restore command)
    #[error("Source store error: {0}")]
    Source(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

/// Errors that terminate the whole run with a non-zero exit
///
/// Reachable only from the backup and initial pull phases, before any
/// destination mutation for the affected collection.
#[derive(Debug, Error)]
pub enum FatalError {
    /// Full read of a source collection failed
    #[error("Failed to read source collection '{collection}': {message}")]
    SourceRead { collection: String, message: String },

    /// Snapshot could not be serialized or written to durable storage
    #[error("Failed to write snapshot for '{collection}': {message}")]
    SnapshotWrite { collection: String, message: String },
}

impl FatalError {
    /// Collection the failure relates to
    pub fn collection(&self) -> &str {
        match self {
            FatalError::SourceRead { collection, .. } => collection,
            FatalError::SnapshotWrite { collection, .. } => collection,
        }
    }
}

/// Outcome of a single destination upsert that did not succeed
///
/// `RateLimited` is the congestion signal that shrinks the batch size;
/// everything else counts as a plain per-record failure. All variants
/// requeue the record for retry.
#[derive(Debug, Clone, Error)]
pub enum UpsertError {
    /// Destination signalled rate-limiting (throttled)
    #[error("rate limited by destination")]
    RateLimited,

    /// Per-call timeout elapsed before the destination settled
    #[error("upsert timed out")]
    Timeout,

    /// Any other per-record write failure
    #[error("{0}")]
    Other(String),
}

impl UpsertError {
    /// Whether this failure is the destination's congestion signal
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, UpsertError::RateLimited)
    }
}

/// A telemetry sink write failure
///
/// Never propagated beyond the sink: reported to the local diagnostic
/// channel and swallowed.
#[derive(Debug, Error)]
#[error("Telemetry sink '{sink}' failed: {message}")]
pub struct TelemetryError {
    /// Which sink failed (e.g. "event-log", "metrics")
    pub sink: String,
    /// Underlying failure description
    pub message: String,
}

impl TelemetryError {
    /// Create a new telemetry error for a named sink
    pub fn new(sink: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sink: sink.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CaravanError {
    fn from(err: std::io::Error) -> Self {
        CaravanError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CaravanError {
    fn from(err: serde_json::Error) -> Self {
        CaravanError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for CaravanError {
    fn from(err: toml::de::Error) -> Self {
        CaravanError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_error_display() {
        let err = FatalError::SourceRead {
            collection: "users".to_string(),
            message: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to read source collection 'users': connection refused"
        );
        assert_eq!(err.collection(), "users");
    }

    #[test]
    fn test_fatal_error_conversion() {
        let fatal = FatalError::SnapshotWrite {
            collection: "transactions".to_string(),
            message: "disk full".to_string(),
        };
        let err: CaravanError = fatal.into();
        assert!(matches!(err, CaravanError::Fatal(_)));
    }

    #[test]
    fn test_upsert_error_rate_limited() {
        assert!(UpsertError::RateLimited.is_rate_limited());
        assert!(!UpsertError::Timeout.is_rate_limited());
        assert!(!UpsertError::Other("boom".to_string()).is_rate_limited());
    }

    #[test]
    fn test_telemetry_error_display() {
        let err = TelemetryError::new("metrics", "endpoint unreachable");
        assert_eq!(
            err.to_string(),
            "Telemetry sink 'metrics' failed: endpoint unreachable"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CaravanError = io_err.into();
        assert!(matches!(err, CaravanError::Io(_)));
    }

    #[test]
    fn test_errors_implement_std_error() {
        let err = CaravanError::Configuration("bad".to_string());
        let _: &dyn std::error::Error = &err;
        let err = UpsertError::RateLimited;
        let _: &dyn std::error::Error = &err;
    }
}
