//! Telemetry-side error types

use std::fmt;

/// Errors internal to the span buffering and export pipeline.
///
/// These never propagate to the workflow caller; delivery is best-effort.
#[derive(Debug)]
pub enum TraceError {
    /// Invalid trace or span identifier.
    InvalidId(String),

    /// Batch delivery to the collector failed.
    Export(String),

    /// Serialization error.
    Serialization(String),

    /// Internal error (lock poisoning and similar).
    Internal(String),
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidId(msg) => write!(f, "invalid identifier: {}", msg),
            Self::Export(msg) => write!(f, "export error: {}", msg),
            Self::Serialization(msg) => write!(f, "serialization error: {}", msg),
            Self::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for TraceError {}

impl From<serde_json::Error> for TraceError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for telemetry operations.
pub type TraceResult<T> = Result<T, TraceError>;
