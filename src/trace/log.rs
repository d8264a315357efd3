//! Log/trace correlation
//!
//! Emits log records tagged with the trace ID and the innermost open span
//! ID of the calling execution path, read from its [`ContextStack`]. Callers
//! never thread identifiers through their signatures; the context they
//! already own carries them.

use super::context::ContextStack;
use super::span::SpanId;
use tracing::Level;

fn current_span_hex(ctx: &ContextStack) -> String {
    ctx.current()
        .unwrap_or_else(SpanId::invalid)
        .to_hex()
}

/// Emit a record at `level` tagged with the path's trace and span identity.
pub fn log(ctx: &ContextStack, level: Level, message: &str) {
    let trace_id = ctx.trace_id().to_hex();
    let span_id = current_span_hex(ctx);

    if level == Level::ERROR {
        tracing::error!(trace_id = %trace_id, span_id = %span_id, "{}", message);
    } else if level == Level::WARN {
        tracing::warn!(trace_id = %trace_id, span_id = %span_id, "{}", message);
    } else if level == Level::INFO {
        tracing::info!(trace_id = %trace_id, span_id = %span_id, "{}", message);
    } else if level == Level::DEBUG {
        tracing::debug!(trace_id = %trace_id, span_id = %span_id, "{}", message);
    } else {
        tracing::trace!(trace_id = %trace_id, span_id = %span_id, "{}", message);
    }
}

/// Emit an info record with trace/span correlation.
pub fn info(ctx: &ContextStack, message: &str) {
    log(ctx, Level::INFO, message);
}

/// Emit a warning record with trace/span correlation.
pub fn warn(ctx: &ContextStack, message: &str) {
    log(ctx, Level::WARN, message);
}

/// Emit an error record with trace/span correlation.
pub fn error(ctx: &ContextStack, message: &str) {
    log(ctx, Level::ERROR, message);
}
