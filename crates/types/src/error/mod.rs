// Path: crates/types/src/error/mod.rs
//! Core error types for the observer.

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// The observer's error taxonomy.
///
/// Setup-phase variants (`UpstreamUnavailable`, `InvalidInput`, `Config`) are
/// fatal to the current report cycle. `ProbeFailed` never escapes the gateway
/// assessor; it is folded into a failing assessment. `SinkFailed` and
/// `MaxRetriesExceeded` are fatal to a single publish sink only.
#[derive(Debug, Error)]
pub enum ObserverError {
    /// A chain, ledger or list collaborator could not be reached or returned
    /// an unusable response.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    /// A single name or ownership probe against one host failed.
    #[error("Probe failed: {0}")]
    ProbeFailed(String),
    /// One publish sink failed to save the report.
    #[error("Sink '{sink}' failed: {reason}")]
    SinkFailed {
        /// The name of the sink that failed.
        sink: String,
        /// A description of the failure.
        reason: String,
    },
    /// A bounded retry loop gave up.
    #[error("Max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded {
        /// The number of attempts made.
        attempts: u32,
        /// The error from the final attempt.
        last_error: String,
    },
    /// A caller supplied an argument the operation cannot work with.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Reading or writing local persistent state failed.
    #[error("Storage error: {0}")]
    Storage(String),
    /// Encoding or decoding a report or response failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The node configuration is unusable.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ErrorCode for ObserverError {
    fn code(&self) -> &'static str {
        match self {
            Self::UpstreamUnavailable(_) => "OBSERVER_UPSTREAM_UNAVAILABLE",
            Self::ProbeFailed(_) => "OBSERVER_PROBE_FAILED",
            Self::SinkFailed { .. } => "OBSERVER_SINK_FAILED",
            Self::MaxRetriesExceeded { .. } => "OBSERVER_MAX_RETRIES_EXCEEDED",
            Self::InvalidInput(_) => "OBSERVER_INVALID_INPUT",
            Self::Storage(_) => "OBSERVER_STORAGE_ERROR",
            Self::Serialization(_) => "OBSERVER_SERIALIZATION_ERROR",
            Self::Config(_) => "OBSERVER_CONFIG_ERROR",
        }
    }
}

impl From<std::io::Error> for ObserverError {
    fn from(e: std::io::Error) -> Self {
        ObserverError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for ObserverError {
    fn from(e: serde_json::Error) -> Self {
        ObserverError::Serialization(e.to_string())
    }
}
