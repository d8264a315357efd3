//! Trigger interface types
//!
//! The inbound invocation and its result, as consumed by whatever server
//! layer fronts the pipeline. The HTTP surface itself is an external
//! collaborator; this module only defines the payloads and the status-code
//! mapping.

use super::error::PipelineError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An inbound workflow invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerRequest {
    /// Optional caller-supplied correlation identifier, recorded on the
    /// root span.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl TriggerRequest {
    /// Request without a correlation identifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request carrying a correlation identifier.
    pub fn with_correlation_id(id: impl Into<String>) -> Self {
        Self {
            correlation_id: Some(id.into()),
        }
    }
}

/// Successful workflow result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerResponse {
    /// Human-readable completion message.
    pub message: String,

    /// Payload fetched from the external dependency.
    pub external_data: Value,
}

/// HTTP-style status code for a finished invocation.
pub fn status_code(result: &Result<TriggerResponse, PipelineError>) -> u16 {
    match result {
        Ok(_) => 200,
        Err(e) => e.status_code(),
    }
}
