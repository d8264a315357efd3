//! Span buffering and batch export
//!
//! Decouples span completion from delivery. Producers hand completed spans
//! to a [`SpanBuffer`] without ever blocking; a background worker drains the
//! buffer into batches and delivers them through a [`CollectorTransport`]
//! with bounded retry. From the exporter's perspective each span moves
//! Buffered -> Batched -> Delivered, or terminates early as
//! Dropped(capacity) or Dropped(delivery-exhausted).

use super::config::{CollectorKind, TelemetryConfig};
use super::error::{TraceError, TraceResult};
use super::span::{AttributeValue, Span, SpanStatus};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout};
use tracing::{debug, warn};

/// Serialized span as delivered to the collector.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSpan {
    /// Trace ID (hex).
    pub trace_id: String,

    /// Span ID (hex).
    pub span_id: String,

    /// Parent span ID (hex), absent for root spans.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,

    /// Span name.
    pub name: String,

    /// Start time (nanoseconds since epoch).
    pub start_time_unix_nano: u64,

    /// End time (nanoseconds since epoch).
    pub end_time_unix_nano: u64,

    /// Final status.
    pub status: SpanStatus,

    /// Attribute mapping.
    pub attributes: HashMap<String, AttributeValue>,
}

impl From<&Span> for ExportSpan {
    fn from(span: &Span) -> Self {
        Self {
            trace_id: span.trace_id.to_hex(),
            span_id: span.span_id.to_hex(),
            parent_span_id: span.parent_span_id.map(|id| id.to_hex()),
            name: span.name.clone(),
            start_time_unix_nano: span.start_time.timestamp_nanos_opt().unwrap_or(0) as u64,
            end_time_unix_nano: span
                .end_time
                .and_then(|t| t.timestamp_nanos_opt())
                .unwrap_or(0) as u64,
            status: span.status.clone(),
            attributes: span.attributes.clone(),
        }
    }
}

/// Resource identity attached to every batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResource {
    /// Emitting service name.
    pub service_name: String,
}

/// One atomically delivered batch of completed spans.
#[derive(Debug, Clone, Serialize)]
pub struct ExportBatch {
    /// Resource identity.
    pub resource: ExportResource,

    /// Batch contents, in submission order.
    pub spans: Vec<ExportSpan>,
}

/// Trait for collector transports.
///
/// Transport and wire encoding beyond the batch JSON are an external
/// collaborator's concern; implementations only report whether the batch
/// was accepted.
pub trait CollectorTransport: Send + Sync {
    /// Deliver one batch to the collector.
    fn deliver(&self, batch: &ExportBatch) -> TraceResult<()>;
}

/// No-op transport (discards batches).
#[derive(Debug, Default)]
pub struct NoopCollector;

impl NoopCollector {
    /// Create a new no-op transport.
    pub fn new() -> Self {
        Self
    }
}

impl CollectorTransport for NoopCollector {
    fn deliver(&self, _batch: &ExportBatch) -> TraceResult<()> {
        Ok(())
    }
}

/// Console transport (writes batches to stdout as JSON lines).
#[derive(Debug, Default)]
pub struct ConsoleCollector {
    pretty: bool,
}

impl ConsoleCollector {
    /// Create a new console transport.
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Create a pretty-printing console transport.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl CollectorTransport for ConsoleCollector {
    fn deliver(&self, batch: &ExportBatch) -> TraceResult<()> {
        let json = if self.pretty {
            serde_json::to_string_pretty(batch)?
        } else {
            serde_json::to_string(batch)?
        };
        println!("{}", json);
        Ok(())
    }
}

/// In-memory transport (for tests).
#[derive(Debug, Default)]
pub struct InMemoryCollector {
    batches: Mutex<Vec<ExportBatch>>,
}

impl InMemoryCollector {
    /// Create a new in-memory transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// All delivered batches, in delivery order.
    pub fn batches(&self) -> Vec<ExportBatch> {
        self.batches.lock().map(|b| b.clone()).unwrap_or_default()
    }

    /// All delivered spans, flattened across batches.
    pub fn spans(&self) -> Vec<ExportSpan> {
        self.batches()
            .into_iter()
            .flat_map(|b| b.spans)
            .collect()
    }

    /// Total delivered span count.
    pub fn span_count(&self) -> usize {
        self.batches()
            .iter()
            .map(|b| b.spans.len())
            .sum()
    }

    /// Delivered spans with the given name.
    pub fn find_by_name(&self, name: &str) -> Vec<ExportSpan> {
        self.spans()
            .into_iter()
            .filter(|s| s.name == name)
            .collect()
    }

    /// Discard all recorded batches.
    pub fn clear(&self) {
        if let Ok(mut batches) = self.batches.lock() {
            batches.clear();
        }
    }
}

impl CollectorTransport for InMemoryCollector {
    fn deliver(&self, batch: &ExportBatch) -> TraceResult<()> {
        let mut batches = self
            .batches
            .lock()
            .map_err(|_| TraceError::Internal("lock poisoned".to_string()))?;
        batches.push(batch.clone());
        Ok(())
    }
}

/// Create a transport from configuration.
///
/// Network transports (OTLP over gRPC/HTTP) live outside this crate; until
/// one is wired in, the console stands in and `collector_endpoint` is only
/// reported.
// TODO: add an OTLP HTTP transport variant that dials collector_endpoint.
pub fn create_collector(config: &TelemetryConfig) -> Arc<dyn CollectorTransport> {
    match config.collector {
        CollectorKind::None => Arc::new(NoopCollector::new()),
        CollectorKind::Console => {
            debug!(
                endpoint = %config.collector_endpoint,
                "no network transport wired, writing batches to stdout"
            );
            Arc::new(ConsoleCollector::new())
        }
        CollectorKind::Memory => Arc::new(InMemoryCollector::new()),
    }
}

/// Monitoring counters for the export pipeline.
#[derive(Debug, Default)]
pub struct ExportStats {
    spans_submitted: AtomicU64,
    spans_exported: AtomicU64,
    spans_dropped_capacity: AtomicU64,
    spans_dropped_delivery: AtomicU64,
    batches_delivered: AtomicU64,
    batches_failed: AtomicU64,
}

impl ExportStats {
    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> ExportStatsSnapshot {
        ExportStatsSnapshot {
            spans_submitted: self.spans_submitted.load(Ordering::Relaxed),
            spans_exported: self.spans_exported.load(Ordering::Relaxed),
            spans_dropped_capacity: self.spans_dropped_capacity.load(Ordering::Relaxed),
            spans_dropped_delivery: self.spans_dropped_delivery.load(Ordering::Relaxed),
            batches_delivered: self.batches_delivered.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of [`ExportStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportStatsSnapshot {
    /// Spans handed to the buffer.
    pub spans_submitted: u64,
    /// Spans delivered to the collector.
    pub spans_exported: u64,
    /// Spans evicted because the buffer hit its hard cap.
    pub spans_dropped_capacity: u64,
    /// Spans dropped after delivery retries were exhausted.
    pub spans_dropped_delivery: u64,
    /// Batches accepted by the collector.
    pub batches_delivered: u64,
    /// Batches dropped after exhausting retries.
    pub batches_failed: u64,
}

/// Bounded span buffer shared by all producers and the flush worker.
///
/// `submit` never blocks and never fails: beyond `capacity` the oldest
/// buffered spans are evicted first (FIFO) and counted as capacity drops.
pub struct SpanBuffer {
    queue: Mutex<VecDeque<Span>>,
    capacity: usize,
    flush_threshold: usize,
    notify: Notify,
    stats: Arc<ExportStats>,
}

impl SpanBuffer {
    /// Create a buffer with a hard capacity and a flush trigger threshold.
    pub fn new(capacity: usize, flush_threshold: usize, stats: Arc<ExportStats>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            flush_threshold: flush_threshold.max(1),
            notify: Notify::new(),
            stats,
        }
    }

    /// Hand a completed span to the export pipeline. Non-blocking.
    pub fn submit(&self, span: Span) {
        let at_threshold = {
            let mut queue = self
                .queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            while queue.len() >= self.capacity {
                queue.pop_front();
                self.stats
                    .spans_dropped_capacity
                    .fetch_add(1, Ordering::Relaxed);
            }

            queue.push_back(span);
            self.stats.spans_submitted.fetch_add(1, Ordering::Relaxed);
            queue.len() >= self.flush_threshold
        };

        if at_threshold {
            self.notify.notify_one();
        }
    }

    /// Atomically remove the entire buffer contents as one batch.
    pub fn drain_all(&self) -> Vec<Span> {
        let mut queue = self
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        queue.drain(..).collect()
    }

    /// Number of currently buffered spans.
    pub fn len(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until a submission pushes the buffer past the flush threshold.
    pub async fn threshold_reached(&self) {
        self.notify.notified().await;
    }
}

/// Deliver one batch with bounded retry and doubling backoff.
///
/// Makes one initial attempt plus up to `retry_limit` retries. Returns
/// whether the batch was ultimately accepted. Counters are left to the
/// caller so a cancelled delivery never half-records an outcome.
async fn deliver_with_retry(
    transport: &dyn CollectorTransport,
    batch: &ExportBatch,
    retry_limit: u32,
    backoff: Duration,
) -> bool {
    let mut delay = backoff;

    for attempt in 0..=retry_limit {
        match transport.deliver(batch) {
            Ok(()) => {
                if attempt > 0 {
                    debug!(attempt, "batch delivered after retry");
                }
                return true;
            }
            Err(e) if attempt < retry_limit => {
                debug!(attempt, error = %e, "batch delivery failed, backing off");
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
            }
            Err(e) => {
                warn!(
                    attempts = retry_limit + 1,
                    error = %e,
                    "batch delivery failed on final attempt"
                );
            }
        }
    }

    false
}

fn make_batch(service_name: &str, spans: &[Span]) -> ExportBatch {
    ExportBatch {
        resource: ExportResource {
            service_name: service_name.to_string(),
        },
        spans: spans.iter().map(ExportSpan::from).collect(),
    }
}

/// Drain the buffer and deliver its contents as one batch, recording the
/// terminal outcome for every span.
async fn flush_batch(
    buffer: &SpanBuffer,
    transport: &dyn CollectorTransport,
    service_name: &str,
    retry_limit: u32,
    backoff: Duration,
    stats: &ExportStats,
) {
    let spans = buffer.drain_all();
    if spans.is_empty() {
        return;
    }

    let batch = make_batch(service_name, &spans);
    let count = spans.len() as u64;

    if deliver_with_retry(transport, &batch, retry_limit, backoff).await {
        stats.spans_exported.fetch_add(count, Ordering::Relaxed);
        stats.batches_delivered.fetch_add(1, Ordering::Relaxed);
    } else {
        stats.spans_dropped_delivery.fetch_add(count, Ordering::Relaxed);
        stats.batches_failed.fetch_add(1, Ordering::Relaxed);
        warn!(spans = count, "dropped batch after exhausting delivery retries");
    }
}

/// Owns one open span and guarantees it reaches the buffer exactly once.
///
/// [`SpanGuard::complete`] finalizes and submits the span. If the guard is
/// dropped instead (the invocation was cancelled or timed out mid-phase),
/// the span is force-closed with [`SpanStatus::cancelled`] and submitted,
/// so no span is ever silently lost.
pub struct SpanGuard {
    span: Option<Span>,
    buffer: Arc<SpanBuffer>,
}

impl SpanGuard {
    /// Wrap an open span with a submission handle.
    pub fn new(span: Span, buffer: Arc<SpanBuffer>) -> Self {
        Self {
            span: Some(span),
            buffer,
        }
    }

    /// The guarded span's ID.
    pub fn id(&self) -> super::span::SpanId {
        self.span
            .as_ref()
            .map(|s| s.span_id)
            .unwrap_or_else(super::span::SpanId::invalid)
    }

    /// Set an attribute on the still-open span.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        if let Some(span) = self.span.as_mut() {
            span.set_attribute(key, value);
        }
    }

    /// Complete the span with `status` and submit it for export.
    pub fn complete(mut self, status: SpanStatus) {
        if let Some(mut span) = self.span.take() {
            span.end(status);
            self.buffer.submit(span);
        }
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        if let Some(mut span) = self.span.take() {
            span.end(SpanStatus::cancelled());
            self.buffer.submit(span);
        }
    }
}

/// Batching span exporter with a background flush worker.
///
/// The worker flushes when the buffer crosses `batch_max_size`, when
/// `batch_max_age` elapses, or on explicit request. It runs independently
/// of the workflow and never shares its suspension points.
pub struct BatchExporter {
    buffer: Arc<SpanBuffer>,
    transport: Arc<dyn CollectorTransport>,
    stats: Arc<ExportStats>,
    config: TelemetryConfig,
    shutdown_tx: mpsc::Sender<()>,
    worker: Option<JoinHandle<()>>,
}

impl BatchExporter {
    /// Create the exporter and spawn its flush worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: TelemetryConfig, transport: Arc<dyn CollectorTransport>) -> Self {
        let stats = Arc::new(ExportStats::default());
        let buffer = Arc::new(SpanBuffer::new(
            config.buffer_capacity,
            config.batch_max_size,
            stats.clone(),
        ));

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let worker = {
            let buffer = buffer.clone();
            let transport = transport.clone();
            let stats = stats.clone();
            let service_name = config.service_name.clone();
            let retry_limit = config.export_retry_limit;
            let backoff = config.export_backoff;
            let max_age = config.batch_max_age;

            tokio::spawn(async move {
                let mut ticker = interval(max_age);
                // The first tick completes immediately; it flushes an empty
                // buffer and is harmless.
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            flush_batch(&buffer, &*transport, &service_name, retry_limit, backoff, &stats).await;
                        }
                        _ = buffer.threshold_reached() => {
                            flush_batch(&buffer, &*transport, &service_name, retry_limit, backoff, &stats).await;
                        }
                        _ = shutdown_rx.recv() => {
                            debug!("export worker shutting down");
                            break;
                        }
                    }
                }
            })
        };

        Self {
            buffer,
            transport,
            stats,
            config,
            shutdown_tx,
            worker: Some(worker),
        }
    }

    /// Cheap producer handle for submitting completed spans.
    pub fn buffer(&self) -> Arc<SpanBuffer> {
        self.buffer.clone()
    }

    /// Submit a completed span. Non-blocking.
    pub fn submit(&self, span: Span) {
        self.buffer.submit(span);
    }

    /// Explicitly flush everything currently buffered.
    pub async fn flush(&self) {
        flush_batch(
            &self.buffer,
            &*self.transport,
            &self.config.service_name,
            self.config.export_retry_limit,
            self.config.export_backoff,
            &self.stats,
        )
        .await;
    }

    /// Current counter snapshot.
    pub fn stats(&self) -> ExportStatsSnapshot {
        self.stats.snapshot()
    }

    /// Stop the worker and attempt a final flush bounded by
    /// `shutdown_flush_timeout`. Spans not flushed in time are dropped.
    /// Returns the final export statistics.
    pub async fn shutdown(mut self) -> ExportStatsSnapshot {
        let _ = self.shutdown_tx.send(()).await;
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }

        let spans = self.buffer.drain_all();
        if spans.is_empty() {
            return self.stats.snapshot();
        }

        let batch = make_batch(&self.config.service_name, &spans);
        let count = spans.len() as u64;

        match timeout(
            self.config.shutdown_flush_timeout,
            deliver_with_retry(
                &*self.transport,
                &batch,
                self.config.export_retry_limit,
                self.config.export_backoff,
            ),
        )
        .await
        {
            Ok(true) => {
                self.stats.spans_exported.fetch_add(count, Ordering::Relaxed);
                self.stats.batches_delivered.fetch_add(1, Ordering::Relaxed);
            }
            Ok(false) => {
                self.stats
                    .spans_dropped_delivery
                    .fetch_add(count, Ordering::Relaxed);
                self.stats.batches_failed.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.stats
                    .spans_dropped_delivery
                    .fetch_add(count, Ordering::Relaxed);
                self.stats.batches_failed.fetch_add(1, Ordering::Relaxed);
                warn!(spans = count, "shutdown flush deadline exceeded, dropping spans");
            }
        }

        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::span::{SpanStatus, TraceId};
    use std::sync::atomic::AtomicU32;

    fn completed_span(name: &str) -> Span {
        let mut span = Span::begin(name, TraceId::generate());
        span.set_attribute("test.key", "test.value");
        span.end(SpanStatus::ok());
        span
    }

    /// Transport that fails the first `failures` deliveries.
    struct FlakyCollector {
        failures: AtomicU32,
        inner: InMemoryCollector,
    }

    impl FlakyCollector {
        fn new(failures: u32) -> Self {
            Self {
                failures: AtomicU32::new(failures),
                inner: InMemoryCollector::new(),
            }
        }
    }

    impl CollectorTransport for FlakyCollector {
        fn deliver(&self, batch: &ExportBatch) -> TraceResult<()> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(TraceError::Export("collector unavailable".to_string()));
            }
            self.inner.deliver(batch)
        }
    }

    fn test_config() -> TelemetryConfig {
        TelemetryConfig {
            batch_max_size: 100,
            batch_max_age: Duration::from_secs(60),
            buffer_capacity: 1000,
            export_retry_limit: 2,
            export_backoff: Duration::from_millis(1),
            shutdown_flush_timeout: Duration::from_secs(1),
            ..Default::default()
        }
    }

    #[test]
    fn export_span_conversion() {
        let span = completed_span("database_query");
        let wire = ExportSpan::from(&span);

        assert_eq!(wire.trace_id, span.trace_id.to_hex());
        assert_eq!(wire.span_id, span.span_id.to_hex());
        assert!(wire.parent_span_id.is_none());
        assert_eq!(wire.name, "database_query");
        assert!(wire.end_time_unix_nano >= wire.start_time_unix_nano);
        assert!(wire.attributes.contains_key("test.key"));
    }

    #[test]
    fn export_span_wire_field_names() {
        let wire = ExportSpan::from(&completed_span("processing"));
        let json = serde_json::to_string(&wire).unwrap();
        assert!(json.contains("\"traceId\""));
        assert!(json.contains("\"spanId\""));
        assert!(json.contains("\"startTimeUnixNano\""));
        assert!(!json.contains("\"parentSpanId\""));
    }

    #[test]
    fn buffer_below_capacity_never_drops() {
        let stats = Arc::new(ExportStats::default());
        let buffer = SpanBuffer::new(10, 100, stats.clone());

        for _ in 0..10 {
            buffer.submit(completed_span("task1"));
        }

        assert_eq!(buffer.len(), 10);
        assert_eq!(stats.snapshot().spans_dropped_capacity, 0);
    }

    #[test]
    fn buffer_overflow_evicts_oldest_first() {
        let stats = Arc::new(ExportStats::default());
        let buffer = SpanBuffer::new(5, 100, stats.clone());

        for i in 0..8 {
            buffer.submit(completed_span(&format!("span-{}", i)));
        }

        let remaining = buffer.drain_all();
        let names: Vec<&str> = remaining.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["span-3", "span-4", "span-5", "span-6", "span-7"]);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.spans_dropped_capacity, 3);
        assert_eq!(snapshot.spans_submitted, 8);
    }

    #[test]
    fn buffer_drain_all_takes_everything() {
        let stats = Arc::new(ExportStats::default());
        let buffer = SpanBuffer::new(100, 100, stats);

        buffer.submit(completed_span("a"));
        buffer.submit(completed_span("b"));

        assert_eq!(buffer.drain_all().len(), 2);
        assert!(buffer.is_empty());
        assert!(buffer.drain_all().is_empty());
    }

    #[tokio::test]
    async fn flush_delivers_single_batch() {
        let stats = Arc::new(ExportStats::default());
        let buffer = SpanBuffer::new(100, 100, stats.clone());
        let collector = InMemoryCollector::new();

        buffer.submit(completed_span("database_query"));
        buffer.submit(completed_span("processing"));

        flush_batch(&buffer, &collector, "test", 0, Duration::from_millis(1), &stats).await;

        let batches = collector.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].spans.len(), 2);
        assert_eq!(batches[0].resource.service_name, "test");

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.spans_exported, 2);
        assert_eq!(snapshot.batches_delivered, 1);
    }

    #[tokio::test]
    async fn retry_succeeds_within_limit() {
        let collector = FlakyCollector::new(2);
        let batch = make_batch("test", &[completed_span("task1")]);

        let delivered = deliver_with_retry(&collector, &batch, 2, Duration::from_millis(1)).await;
        assert!(delivered);
        assert_eq!(collector.inner.span_count(), 1);
    }

    #[tokio::test]
    async fn retry_exhaustion_drops_batch() {
        let stats = Arc::new(ExportStats::default());
        let buffer = SpanBuffer::new(100, 100, stats.clone());
        // Fails the initial attempt and both retries.
        let collector = FlakyCollector::new(3);

        buffer.submit(completed_span("task1"));
        buffer.submit(completed_span("task2"));

        flush_batch(&buffer, &collector, "test", 2, Duration::from_millis(1), &stats).await;

        assert_eq!(collector.inner.span_count(), 0);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.spans_dropped_delivery, 2);
        assert_eq!(snapshot.batches_failed, 1);
        assert_eq!(snapshot.spans_exported, 0);
    }

    #[tokio::test]
    async fn size_threshold_triggers_background_flush() {
        let collector = Arc::new(InMemoryCollector::new());
        let config = TelemetryConfig {
            batch_max_size: 3,
            ..test_config()
        };
        let exporter = BatchExporter::start(config, collector.clone());

        for i in 0..3 {
            exporter.submit(completed_span(&format!("span-{}", i)));
        }

        // Give the worker a moment to observe the threshold notification.
        for _ in 0..50 {
            if collector.span_count() == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(collector.span_count(), 3);
        exporter.shutdown().await;
    }

    #[tokio::test]
    async fn timer_triggers_background_flush() {
        let collector = Arc::new(InMemoryCollector::new());
        let config = TelemetryConfig {
            batch_max_size: 1000,
            batch_max_age: Duration::from_millis(20),
            ..test_config()
        };
        let exporter = BatchExporter::start(config, collector.clone());

        exporter.submit(completed_span("database_query"));

        for _ in 0..50 {
            if collector.span_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(collector.span_count(), 1);
        exporter.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_flushes_remaining_spans() {
        let collector = Arc::new(InMemoryCollector::new());
        let exporter = BatchExporter::start(test_config(), collector.clone());

        exporter.submit(completed_span("final_computation"));
        exporter.shutdown().await;

        assert_eq!(collector.span_count(), 1);
    }

    #[tokio::test]
    async fn exporter_stats_track_outcomes() {
        let collector = Arc::new(InMemoryCollector::new());
        let exporter = BatchExporter::start(test_config(), collector.clone());

        exporter.submit(completed_span("task1"));
        exporter.flush().await;

        let stats = exporter.stats();
        assert_eq!(stats.spans_submitted, 1);
        assert_eq!(stats.spans_exported, 1);
        assert_eq!(stats.batches_delivered, 1);
        assert_eq!(stats.spans_dropped_capacity, 0);
        assert_eq!(stats.spans_dropped_delivery, 0);

        exporter.shutdown().await;
    }

    #[test]
    fn span_guard_complete_submits_once() {
        let stats = Arc::new(ExportStats::default());
        let buffer = Arc::new(SpanBuffer::new(100, 100, stats.clone()));

        let span = Span::begin("database_query", TraceId::generate());
        let guard = SpanGuard::new(span, buffer.clone());
        guard.complete(SpanStatus::ok());

        let spans = buffer.drain_all();
        assert_eq!(spans.len(), 1);
        assert!(spans[0].is_ended());
        assert_eq!(spans[0].status, SpanStatus::ok());
        assert_eq!(stats.snapshot().spans_submitted, 1);
    }

    #[test]
    fn span_guard_drop_force_closes_as_cancelled() {
        let stats = Arc::new(ExportStats::default());
        let buffer = Arc::new(SpanBuffer::new(100, 100, stats));

        {
            let mut guard = SpanGuard::new(
                Span::begin("external_call", TraceId::generate()),
                buffer.clone(),
            );
            guard.set_attribute("http.url", "http://example.invalid");
            // Dropped without complete(), as a cancelled invocation would.
        }

        let spans = buffer.drain_all();
        assert_eq!(spans.len(), 1);
        assert!(spans[0].is_ended());
        assert_eq!(spans[0].status.code, crate::trace::span::StatusCode::Cancelled);
        assert!(spans[0].attributes.contains_key("http.url"));
    }

    #[test]
    fn create_collector_variants() {
        let batch = make_batch("test", &[completed_span("task1")]);

        let noop = create_collector(&TelemetryConfig {
            collector: CollectorKind::None,
            ..Default::default()
        });
        assert!(noop.deliver(&batch).is_ok());

        let memory = create_collector(&TelemetryConfig {
            collector: CollectorKind::Memory,
            collector_endpoint: "http://collector.internal:4317".to_string(),
            ..Default::default()
        });
        assert!(memory.deliver(&batch).is_ok());
    }
}
