//! Telemetry configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the span export pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Service name reported with every exported batch.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Which collector transport to use.
    #[serde(default)]
    pub collector: CollectorKind,

    /// Collector endpoint for network transports.
    #[serde(default = "default_collector_endpoint")]
    pub collector_endpoint: String,

    /// Buffered span count that triggers an early flush.
    #[serde(default = "default_batch_max_size")]
    pub batch_max_size: usize,

    /// Maximum time between flushes.
    #[serde(default = "default_batch_max_age", with = "humantime_serde")]
    pub batch_max_age: Duration,

    /// Hard cap on buffered spans; the oldest are evicted beyond this.
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Retries after a failed delivery before the batch is dropped.
    #[serde(default = "default_export_retry_limit")]
    pub export_retry_limit: u32,

    /// Initial delay between delivery attempts; doubles per retry.
    #[serde(default = "default_export_backoff", with = "humantime_serde")]
    pub export_backoff: Duration,

    /// Deadline for the final flush during shutdown.
    #[serde(default = "default_shutdown_flush_timeout", with = "humantime_serde")]
    pub shutdown_flush_timeout: Duration,
}

fn default_service_name() -> String {
    "traceflow".to_string()
}

fn default_collector_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_batch_max_size() -> usize {
    128
}

fn default_batch_max_age() -> Duration {
    Duration::from_secs(5)
}

fn default_buffer_capacity() -> usize {
    2048
}

fn default_export_retry_limit() -> u32 {
    3
}

fn default_export_backoff() -> Duration {
    Duration::from_millis(200)
}

fn default_shutdown_flush_timeout() -> Duration {
    Duration::from_secs(5)
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            collector: CollectorKind::default(),
            collector_endpoint: default_collector_endpoint(),
            batch_max_size: default_batch_max_size(),
            batch_max_age: default_batch_max_age(),
            buffer_capacity: default_buffer_capacity(),
            export_retry_limit: default_export_retry_limit(),
            export_backoff: default_export_backoff(),
            shutdown_flush_timeout: default_shutdown_flush_timeout(),
        }
    }
}

/// Collector transport selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectorKind {
    /// Discard batches (for benchmarks and disabled telemetry).
    None,

    /// Write batches to stdout as JSON lines.
    #[default]
    Console,

    /// Keep batches in memory (for tests).
    Memory,
}
