//! Workflow pipeline executor.
//!
//! Runs a fixed multi-phase workload under a shared trace context: a
//! database query, a processing step, a concurrent fan-out of three
//! sub-tasks, a call to an external service, and a final computation.
//! Every phase opens a span, and the executor guarantees that a span is
//! recorded for each phase that starts, even when the invocation is
//! cancelled mid-flight.
//!
//! The entry point is [`PipelineExecutor`]; feed it a [`TriggerRequest`]
//! and it returns a [`TriggerResponse`] or a [`PipelineError`] that maps
//! onto an HTTP-style status code.

pub mod config;
pub mod error;
pub mod executor;
pub mod external;
pub mod trigger;

pub use config::{FaultSpec, PipelineConfig};
pub use error::PipelineError;
pub use executor::{Phase, PipelineExecutor, ROOT_SPAN};
pub use external::{
    ExternalCallAdapter, ExternalCallError, ExternalResponse, ExternalService,
    SimulatedExternalService,
};
pub use trigger::{status_code, TriggerRequest, TriggerResponse};
