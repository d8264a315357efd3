//! External dependency call adapter
//!
//! Wraps the pipeline's single outbound call in its own span and classifies
//! the outcome. Transport failures and non-2xx statuses are errors; the
//! adapter never retries. Retry policy, if any, belongs to the caller.

use crate::trace::{log, ContextStack, SpanBuffer, SpanGuard, SpanStatus};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors from the external dependency call.
#[derive(Debug, Clone, Error)]
pub enum ExternalCallError {
    /// The call never produced a response.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The dependency answered with a non-success status.
    #[error("unexpected status {0}")]
    Status(u16),
}

/// Response from the external dependency.
#[derive(Debug, Clone)]
pub struct ExternalResponse {
    /// HTTP-style status code.
    pub status: u16,

    /// Response body.
    pub body: Value,
}

impl ExternalResponse {
    /// Check for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The opaque external dependency invoked mid-pipeline.
///
/// The real transport lives outside this crate; implementations only
/// produce a status and body, or a transport failure.
pub trait ExternalService: Send + Sync {
    /// Perform the outbound call.
    fn fetch(
        &self,
        endpoint: &str,
    ) -> impl Future<Output = Result<ExternalResponse, ExternalCallError>> + Send;
}

/// Stand-in dependency modeled on the todo endpoint the original workflow
/// fetched. Configurable status and latency, no network.
#[derive(Debug, Clone)]
pub struct SimulatedExternalService {
    delay: Duration,
    status: u16,
    fail_transport: bool,
}

impl SimulatedExternalService {
    /// Successful service with the given simulated latency.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            status: 200,
            fail_transport: false,
        }
    }

    /// Respond with the given status instead of 200.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Fail at the transport level before any response arrives.
    pub fn with_transport_failure(mut self) -> Self {
        self.fail_transport = true;
        self
    }
}

impl ExternalService for SimulatedExternalService {
    async fn fetch(&self, _endpoint: &str) -> Result<ExternalResponse, ExternalCallError> {
        tokio::time::sleep(self.delay).await;

        if self.fail_transport {
            return Err(ExternalCallError::Transport(
                "connection refused".to_string(),
            ));
        }

        let body = if (200..300).contains(&self.status) {
            json!({
                "userId": 1,
                "id": 1,
                "title": "delectus aut autem",
                "completed": false
            })
        } else {
            json!({ "error": "upstream failure" })
        };

        Ok(ExternalResponse {
            status: self.status,
            body,
        })
    }
}

/// Wraps one external call in an `external_call` span.
#[derive(Debug)]
pub struct ExternalCallAdapter<S> {
    service: S,
}

impl<S: ExternalService> ExternalCallAdapter<S> {
    /// Create an adapter around a service implementation.
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// Call the dependency under its own span and classify the outcome.
    ///
    /// The span records the endpoint and, when a response arrived, its
    /// status code. Non-success outcomes mark the span as error and are
    /// returned to the caller without retrying.
    pub async fn call(
        &self,
        ctx: &mut ContextStack,
        sink: &Arc<SpanBuffer>,
        endpoint: &str,
    ) -> Result<Value, ExternalCallError> {
        let mut guard = SpanGuard::new(ctx.open("external_call"), sink.clone());
        guard.set_attribute("http.url", endpoint);

        let outcome = match self.service.fetch(endpoint).await {
            Ok(response) => {
                guard.set_attribute("http.status_code", i64::from(response.status));
                if response.is_success() {
                    Ok(response.body)
                } else {
                    Err(ExternalCallError::Status(response.status))
                }
            }
            Err(e) => Err(e),
        };

        let span_id = guard.id();
        match &outcome {
            Ok(_) => {
                log::info(ctx, "external call completed");
                ctx.close(span_id);
                guard.complete(SpanStatus::ok());
            }
            Err(e) => {
                log::warn(ctx, &format!("external call failed: {}", e));
                ctx.close(span_id);
                guard.complete(SpanStatus::error(e.to_string()));
            }
        }

        outcome
    }
}
