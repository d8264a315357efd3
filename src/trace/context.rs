//! Per-path context stack
//!
//! Tracks the currently open spans of one logical execution path. Each
//! concurrent branch owns its own stack: forking copies the stack by value,
//! so branches never share mutable state and no locking is needed.

use super::span::{Span, SpanId, TraceId};

/// Ordered stack of currently open span IDs for one execution path.
///
/// The top of the stack is the innermost active span and becomes the parent
/// of any span opened next. Spans close in strict reverse order of opening.
#[derive(Debug, Clone)]
pub struct ContextStack {
    trace_id: TraceId,
    open: Vec<SpanId>,
}

impl ContextStack {
    /// Create an empty context for a new trace.
    pub fn new(trace_id: TraceId) -> Self {
        Self {
            trace_id,
            open: Vec::new(),
        }
    }

    /// The trace this path belongs to.
    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// The innermost open span, if any.
    pub fn current(&self) -> Option<SpanId> {
        self.open.last().copied()
    }

    /// Number of currently open spans on this path.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Open a new span parented to the innermost open span (or as a root
    /// span when the stack is empty) and push it onto the stack.
    pub fn open(&mut self, name: impl Into<String>) -> Span {
        let span = match self.current() {
            Some(parent) => Span::begin_child(name, self.trace_id, parent),
            None => Span::begin(name, self.trace_id),
        };
        self.open.push(span.span_id);
        span
    }

    /// Pop the top of the stack, closing `span_id`'s scope.
    ///
    /// Spans must close LIFO within one path; popping anything but the
    /// innermost open span is a bug in the caller and is ignored.
    pub fn close(&mut self, span_id: SpanId) {
        match self.open.last() {
            Some(top) if *top == span_id => {
                self.open.pop();
            }
            _ => debug_assert!(false, "non-LIFO span close on context stack"),
        }
    }

    /// Fork an independent copy of this path's context for a concurrent
    /// branch. Mutations on the branch never affect the caller.
    pub fn fork(&self) -> Self {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_parents_to_top_of_stack() {
        let mut ctx = ContextStack::new(TraceId::generate());

        let root = ctx.open("complex_operation");
        assert!(root.parent_span_id.is_none());
        assert_eq!(ctx.current(), Some(root.span_id));

        let child = ctx.open("database_query");
        assert_eq!(child.parent_span_id, Some(root.span_id));
        assert_eq!(child.trace_id, root.trace_id);
        assert_eq!(ctx.depth(), 2);
    }

    #[test]
    fn close_pops_lifo() {
        let mut ctx = ContextStack::new(TraceId::generate());
        let root = ctx.open("complex_operation");
        let child = ctx.open("processing");

        ctx.close(child.span_id);
        assert_eq!(ctx.current(), Some(root.span_id));

        ctx.close(root.span_id);
        assert_eq!(ctx.current(), None);
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn fork_is_independent() {
        let mut ctx = ContextStack::new(TraceId::generate());
        let root = ctx.open("complex_operation");

        let mut branch = ctx.fork();
        assert_eq!(branch.current(), Some(root.span_id));
        assert_eq!(branch.trace_id(), ctx.trace_id());

        let task = branch.open("task1");
        assert_eq!(task.parent_span_id, Some(root.span_id));

        // The branch's push is invisible to the original path.
        assert_eq!(ctx.current(), Some(root.span_id));
        assert_eq!(ctx.depth(), 1);
        assert_eq!(branch.depth(), 2);
    }

    #[test]
    fn sibling_forks_do_not_interact() {
        let mut ctx = ContextStack::new(TraceId::generate());
        let root = ctx.open("complex_operation");

        let mut a = ctx.fork();
        let mut b = ctx.fork();

        let span_a = a.open("task1");
        let span_b = b.open("task2");

        assert_eq!(span_a.parent_span_id, Some(root.span_id));
        assert_eq!(span_b.parent_span_id, Some(root.span_id));
        assert_ne!(span_a.span_id, span_b.span_id);

        a.close(span_a.span_id);
        assert_eq!(b.current(), Some(span_b.span_id));
    }
}
