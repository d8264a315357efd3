//! # Trace Subsystem
//!
//! Span model, per-path context stacks, and the buffering/export pipeline
//! that carries completed spans to a telemetry collector.
//!
//! ## Features
//!
//! - Trace/span identity with parent linkage for tree reconstruction
//! - Copy-on-fork context stacks (no locking across concurrent branches)
//! - Non-blocking span submission with FIFO eviction under pressure
//! - Size-, age-, and shutdown-triggered batch flushes with bounded retry
//! - Monitoring counters for capacity and delivery drops
//! - Correlated logging tagged with trace/span identifiers

pub mod config;
pub mod context;
pub mod error;
pub mod exporter;
pub mod log;
pub mod span;

pub use config::{CollectorKind, TelemetryConfig};
pub use context::ContextStack;
pub use error::{TraceError, TraceResult};
pub use exporter::{
    create_collector, BatchExporter, CollectorTransport, ConsoleCollector, ExportBatch,
    ExportSpan, ExportStats, ExportStatsSnapshot, InMemoryCollector, NoopCollector, SpanBuffer,
    SpanGuard,
};
pub use span::{AttributeValue, Span, SpanId, SpanStatus, StatusCode, TraceId};
