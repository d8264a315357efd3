//! Span types and identity

use super::error::{TraceError, TraceResult};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// 128-bit trace identifier, shared by all spans of one workflow invocation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceId {
    high: u64,
    low: u64,
}

impl TraceId {
    /// Create a trace ID from high and low parts.
    pub fn new(high: u64, low: u64) -> Self {
        Self { high, low }
    }

    /// Generate a fresh trace ID.
    pub fn generate() -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;

        let counter = COUNTER.fetch_add(1, Ordering::Relaxed);

        // Mix several process-local sources so concurrent generators on the
        // same nanosecond still diverge.
        let mut hasher = DefaultHasher::new();
        std::thread::current().id().hash(&mut hasher);
        counter.hash(&mut hasher);
        timestamp.hash(&mut hasher);
        std::process::id().hash(&mut hasher);

        Self {
            high: timestamp,
            low: hasher.finish(),
        }
    }

    /// Parse from a 32-character hex string.
    pub fn from_hex(hex: &str) -> TraceResult<Self> {
        if hex.len() != 32 {
            return Err(TraceError::InvalidId(format!(
                "expected 32 hex chars, got {}",
                hex.len()
            )));
        }

        let high = u64::from_str_radix(&hex[..16], 16)
            .map_err(|e| TraceError::InvalidId(format!("invalid hex: {}", e)))?;
        let low = u64::from_str_radix(&hex[16..], 16)
            .map_err(|e| TraceError::InvalidId(format!("invalid hex: {}", e)))?;

        Ok(Self { high, low })
    }

    /// Convert to a 32-character hex string.
    pub fn to_hex(&self) -> String {
        format!("{:016x}{:016x}", self.high, self.low)
    }
}

impl fmt::Debug for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TraceId({})", self.to_hex())
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// 64-bit span identifier, unique per span.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpanId(u64);

impl SpanId {
    /// Create a span ID from a raw value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Generate a fresh span ID.
    pub fn generate() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros() as u64;

        let counter = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self((timestamp << 16) | (counter & 0xFFFF))
    }

    /// The zero, invalid span ID.
    pub fn invalid() -> Self {
        Self(0)
    }

    /// Check whether this span ID is valid (non-zero).
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }

    /// Parse from a 16-character hex string.
    pub fn from_hex(hex: &str) -> TraceResult<Self> {
        if hex.len() != 16 {
            return Err(TraceError::InvalidId(format!(
                "expected 16 hex chars, got {}",
                hex.len()
            )));
        }

        let id = u64::from_str_radix(hex, 16)
            .map_err(|e| TraceError::InvalidId(format!("invalid hex: {}", e)))?;

        Ok(Self(id))
    }

    /// Convert to a 16-character hex string.
    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }
}

impl fmt::Debug for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SpanId({})", self.to_hex())
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Span status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    /// Not yet determined (span still open).
    #[default]
    Unset,

    /// Phase completed successfully.
    Ok,

    /// Phase failed.
    Error,

    /// Span force-closed because its invocation was cancelled or timed out.
    Cancelled,
}

/// Span status with optional error detail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpanStatus {
    /// Status code.
    pub code: StatusCode,

    /// Optional detail message (error or cancellation reason).
    pub message: Option<String>,
}

impl SpanStatus {
    /// Success status.
    pub fn ok() -> Self {
        Self {
            code: StatusCode::Ok,
            message: None,
        }
    }

    /// Error status with detail.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::Error,
            message: Some(message.into()),
        }
    }

    /// Cancellation status.
    pub fn cancelled() -> Self {
        Self {
            code: StatusCode::Cancelled,
            message: Some("invocation cancelled".to_string()),
        }
    }
}

/// Attribute value types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// String value
    String(String),

    /// Boolean value
    Bool(bool),

    /// Integer value
    Int(i64),

    /// Float value
    Float(f64),
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for AttributeValue {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for AttributeValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

/// A timed record of one phase of work.
///
/// A span is mutable only while open. [`Span::end`] completes it exactly
/// once; afterwards attribute and status writes are refused. The end time
/// is derived from a monotonic anchor taken at creation, so `end >= start`
/// holds even if the wall clock steps backwards mid-span.
#[derive(Debug, Clone)]
pub struct Span {
    /// Span name (phase name).
    pub name: String,

    /// Trace ID shared by the whole invocation.
    pub trace_id: TraceId,

    /// Unique span ID.
    pub span_id: SpanId,

    /// Enclosing span, if any. Root spans have none.
    pub parent_span_id: Option<SpanId>,

    /// Absolute start time.
    pub start_time: DateTime<Utc>,

    /// Absolute end time. `None` while the span is open.
    pub end_time: Option<DateTime<Utc>>,

    /// Span status.
    pub status: SpanStatus,

    /// Arbitrary key/value metadata.
    pub attributes: HashMap<String, AttributeValue>,

    /// Monotonic anchor for deriving the end time.
    started_at: Instant,
}

impl Span {
    /// Create a new open root span.
    pub fn begin(name: impl Into<String>, trace_id: TraceId) -> Self {
        Self {
            name: name.into(),
            trace_id,
            span_id: SpanId::generate(),
            parent_span_id: None,
            start_time: Utc::now(),
            end_time: None,
            status: SpanStatus::default(),
            attributes: HashMap::new(),
            started_at: Instant::now(),
        }
    }

    /// Create a new open span as a child of `parent`.
    pub fn begin_child(name: impl Into<String>, trace_id: TraceId, parent: SpanId) -> Self {
        let mut span = Self::begin(name, trace_id);
        span.parent_span_id = Some(parent);
        span
    }

    /// Set an attribute. Ignored once the span has completed.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        if self.end_time.is_none() {
            self.attributes.insert(key.into(), value.into());
        }
    }

    /// Complete the span with the given status.
    ///
    /// Only the first call takes effect; a completed span is immutable.
    pub fn end(&mut self, status: SpanStatus) {
        if self.end_time.is_none() {
            let elapsed = ChronoDuration::from_std(self.started_at.elapsed())
                .unwrap_or_else(|_| ChronoDuration::zero());
            self.end_time = Some(self.start_time + elapsed);
            self.status = status;
        }
    }

    /// Check whether the span has completed.
    pub fn is_ended(&self) -> bool {
        self.end_time.is_some()
    }

    /// Duration of the span, if completed.
    pub fn duration(&self) -> Option<ChronoDuration> {
        self.end_time.map(|end| end - self.start_time)
    }
}
