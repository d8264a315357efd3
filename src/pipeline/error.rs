//! Pipeline error taxonomy
//!
//! Workflow-correctness errors propagate to the trigger caller; telemetry
//! delivery problems never appear here.

use super::external::ExternalCallError;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced to the workflow's trigger caller.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// A sequential phase's work failed. Remaining sequential phases are
    /// skipped and the root span is marked error.
    #[error("phase '{phase}' failed: {detail}")]
    Phase {
        /// Name of the failed phase.
        phase: &'static str,
        /// Failure detail.
        detail: String,
    },

    /// One fan-out branch failed. Siblings still ran to completion.
    #[error("sub-task '{task}' failed: {detail}")]
    SubTask {
        /// Name of the failed sub-task.
        task: &'static str,
        /// Failure detail.
        detail: String,
    },

    /// The external dependency call failed (transport or non-2xx).
    #[error("external call failed: {0}")]
    ExternalCall(#[from] ExternalCallError),

    /// The whole invocation exceeded its deadline and was cancelled.
    #[error("invocation timed out after {after:?}")]
    Timeout {
        /// The deadline that elapsed.
        after: Duration,
    },
}

impl PipelineError {
    /// HTTP-style status code for the trigger response.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::ExternalCall(_) => 502,
            Self::Timeout { .. } => 504,
            Self::Phase { .. } | Self::SubTask { .. } => 500,
        }
    }
}
