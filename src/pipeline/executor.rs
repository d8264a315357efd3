//! Pipeline executor
//!
//! Drives the fixed phase graph of one workflow invocation under a shared
//! trace context: sequential phases, one concurrent fan-out joined before
//! proceeding, one external dependency call, and a final phase. Every phase
//! is represented by exactly one span, correctly parented, and every span
//! reaches the exporter even when the invocation is cancelled mid-flight.

use super::config::PipelineConfig;
use super::error::PipelineError;
use super::external::{ExternalCallAdapter, ExternalService};
use super::trigger::{TriggerRequest, TriggerResponse};
use crate::trace::{log, ContextStack, SpanBuffer, SpanGuard, SpanStatus, TraceId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Name of the root span covering the whole invocation.
pub const ROOT_SPAN: &str = "complex_operation";

/// The pipeline's named phases, in execution order.
///
/// `Task1`..`Task3` run concurrently between `Processing` and
/// `ExternalCall`; everything else is strictly sequential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Simulated database lookup.
    DatabaseQuery,

    /// Simulated data processing.
    Processing,

    /// First fan-out sub-task.
    Task1,

    /// Second fan-out sub-task.
    Task2,

    /// Third fan-out sub-task.
    Task3,

    /// External dependency call.
    ExternalCall,

    /// Simulated final computation.
    FinalComputation,
}

impl Phase {
    /// Span name for this phase.
    pub const fn span_name(self) -> &'static str {
        match self {
            Self::DatabaseQuery => "database_query",
            Self::Processing => "processing",
            Self::Task1 => "task1",
            Self::Task2 => "task2",
            Self::Task3 => "task3",
            Self::ExternalCall => "external_call",
            Self::FinalComputation => "final_computation",
        }
    }
}

/// The fan-out sub-tasks, in task order.
const FAN_OUT_TASKS: [Phase; 3] = [Phase::Task1, Phase::Task2, Phase::Task3];

/// Simulated phase work: suspend for the configured delay, then fail if a
/// fault was injected for this phase.
async fn simulate_work(delay: Duration, fault: Option<String>) -> Result<(), String> {
    tokio::time::sleep(delay).await;
    match fault {
        Some(detail) => Err(detail),
        None => Ok(()),
    }
}

/// Runs the fixed phase graph for one invocation.
///
/// Constructed with an explicit span sink and external service; holds no
/// ambient global state. `run` has no side effects beyond spans and logs,
/// so repeated invocations are independent.
pub struct PipelineExecutor<S> {
    config: PipelineConfig,
    sink: Arc<SpanBuffer>,
    adapter: ExternalCallAdapter<S>,
}

impl<S: ExternalService> PipelineExecutor<S> {
    /// Create an executor submitting spans to `sink` and calling `external`
    /// for the external-call phase.
    pub fn new(config: PipelineConfig, sink: Arc<SpanBuffer>, external: S) -> Self {
        Self {
            config,
            sink,
            adapter: ExternalCallAdapter::new(external),
        }
    }

    /// Run one workflow invocation end to end.
    ///
    /// Opens the root span, runs the phases in order, and finalizes the
    /// root with a status derived from the first failure, if any. Spans of
    /// phases that completed before a failure are still exported.
    pub async fn run(
        &self,
        trigger: TriggerRequest,
    ) -> Result<TriggerResponse, PipelineError> {
        let mut ctx = ContextStack::new(TraceId::generate());
        let mut root = SpanGuard::new(ctx.open(ROOT_SPAN), self.sink.clone());
        if let Some(id) = &trigger.correlation_id {
            root.set_attribute("correlation.id", id.as_str());
        }
        log::info(&ctx, "starting complex operation");

        let result = self.run_phases(&mut ctx).await;
        let root_id = root.id();

        match result {
            Ok(external_data) => {
                log::info(&ctx, "complex operation completed");
                ctx.close(root_id);
                root.complete(SpanStatus::ok());
                Ok(TriggerResponse {
                    message: "Complex operation completed".to_string(),
                    external_data,
                })
            }
            Err(e) => {
                log::error(&ctx, &format!("complex operation failed: {}", e));
                ctx.close(root_id);
                root.complete(SpanStatus::error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Run one invocation under a deadline.
    ///
    /// On expiry the invocation future is dropped: every still-open span is
    /// force-closed with cancellation status and submitted by its guard, so
    /// the trace remains complete.
    pub async fn run_with_deadline(
        &self,
        trigger: TriggerRequest,
        deadline: Duration,
    ) -> Result<TriggerResponse, PipelineError> {
        match tokio::time::timeout(deadline, self.run(trigger)).await {
            Ok(result) => result,
            Err(_) => Err(PipelineError::Timeout { after: deadline }),
        }
    }

    async fn run_phases(&self, ctx: &mut ContextStack) -> Result<Value, PipelineError> {
        self.sequential_phase(ctx, Phase::DatabaseQuery, "Database query completed")
            .await?;
        self.sequential_phase(ctx, Phase::Processing, "Data processing completed")
            .await?;
        self.fan_out(ctx).await?;
        let external_data = self
            .adapter
            .call(ctx, &self.sink, &self.config.external_endpoint)
            .await?;
        self.sequential_phase(ctx, Phase::FinalComputation, "Final computation completed")
            .await?;
        Ok(external_data)
    }

    async fn sequential_phase(
        &self,
        ctx: &mut ContextStack,
        phase: Phase,
        done_message: &str,
    ) -> Result<(), PipelineError> {
        let guard = SpanGuard::new(ctx.open(phase.span_name()), self.sink.clone());
        let result = simulate_work(self.config.work_delay, self.fault_for(phase)).await;
        let span_id = guard.id();

        match result {
            Ok(()) => {
                log::info(ctx, done_message);
                ctx.close(span_id);
                guard.complete(SpanStatus::ok());
                Ok(())
            }
            Err(detail) => {
                log::warn(ctx, &format!("{} failed: {}", phase.span_name(), detail));
                ctx.close(span_id);
                guard.complete(SpanStatus::error(detail.clone()));
                Err(PipelineError::Phase {
                    phase: phase.span_name(),
                    detail,
                })
            }
        }
    }

    /// Run the three sub-tasks concurrently on forked contexts and join
    /// them all before reporting. A failed sub-task never aborts its
    /// siblings; the phase's outcome is the first failure in task order.
    ///
    /// The `JoinSet` also ties branch lifetimes to the invocation: if the
    /// invocation is cancelled the set is dropped, its tasks abort, and
    /// each branch's guard force-closes its span as cancelled.
    async fn fan_out(&self, ctx: &ContextStack) -> Result<(), PipelineError> {
        let mut set = tokio::task::JoinSet::new();

        for phase in FAN_OUT_TASKS {
            let mut branch = ctx.fork();
            let sink = self.sink.clone();
            let delay = self.config.work_delay;
            let fault = self.fault_for(phase);

            set.spawn(async move {
                let guard = SpanGuard::new(branch.open(phase.span_name()), sink);
                let result = simulate_work(delay, fault).await;
                let span_id = guard.id();

                match result {
                    Ok(()) => {
                        log::info(&branch, &format!("{} completed", phase.span_name()));
                        branch.close(span_id);
                        guard.complete(SpanStatus::ok());
                        (phase, Ok(()))
                    }
                    Err(detail) => {
                        log::warn(
                            &branch,
                            &format!("{} failed: {}", phase.span_name(), detail),
                        );
                        branch.close(span_id);
                        guard.complete(SpanStatus::error(detail.clone()));
                        (phase, Err(detail))
                    }
                }
            });
        }

        // Join barrier: drain the whole set before reporting, so a failure
        // in one branch never abandons the others.
        let mut failures: Vec<(Phase, String)> = Vec::new();
        let mut join_failure: Option<String> = None;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((phase, Err(detail))) => failures.push((phase, detail)),
                Err(e) => join_failure = Some(format!("sub-task panicked: {}", e)),
            }
        }

        // Branches finish in any order; report the first failure in task
        // order for a deterministic outcome.
        failures.sort_by_key(|(phase, _)| FAN_OUT_TASKS.iter().position(|p| p == phase));
        if let Some((phase, detail)) = failures.into_iter().next() {
            return Err(PipelineError::SubTask {
                task: phase.span_name(),
                detail,
            });
        }
        if let Some(detail) = join_failure {
            return Err(PipelineError::SubTask {
                task: "fan_out",
                detail,
            });
        }
        Ok(())
    }

    fn fault_for(&self, phase: Phase) -> Option<String> {
        self.config
            .fault
            .as_ref()
            .filter(|f| f.phase == phase)
            .map(|f| f.detail.clone())
    }
}
