//! # Traceflow
//!
//! End-to-end observability for a single externally-triggered workflow.
//! One invocation of the "complex operation" runs a fixed phase pipeline
//! (sequential phases, a concurrent fan-out, and one external dependency
//! call) with every phase wrapped in a correlated trace span. Completed
//! spans are handed off to a batching exporter that delivers them to a
//! collector without ever blocking the workflow.
//!
//! ## Features
//!
//! - Trace/span model with parent linkage and per-path context stacks
//! - Copy-on-fork contexts for concurrent branches
//! - Non-blocking span buffer with bounded capacity and FIFO eviction
//! - Timer- and size-triggered batch export with bounded retry
//! - Log/trace correlation via `tracing` records tagged with span identity
//!
//! ## Architecture
//!
//! [`pipeline::PipelineExecutor`] drives the phase graph and produces spans;
//! [`trace::BatchExporter`] owns the buffer and the background flush loop.
//! Both are explicitly constructed and injected rather than accessed as
//! ambient global tracer state.

pub mod pipeline;
pub mod trace;
