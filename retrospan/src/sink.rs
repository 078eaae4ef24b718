//! Span sink: the boundary to the tracing backend.
//!
//! The core never talks to a tracer directly; synthesis drives whatever
//! implements [`SpanSink`]. The `otel` feature ships an adapter for
//! OpenTelemetry tracers; tests use an in-memory recorder.
//!
//! Implementations must be cheap and non-blocking on every method: they run
//! inside a flush that the instrumented application is waiting on. Errors are
//! logged and contained by the caller, so a failing sink costs at most the
//! spans of one session.

use crate::domain::{SinkError, Timestamp};

pub trait SpanSink {
    /// Backend span handle. Handles are cloned into child synthesis calls and
    /// may cross threads, since sessions are flushed from whichever
    /// application thread stops them.
    type Span: Clone + Send + Sync + 'static;

    /// Start a span as a child of `parent` with an explicit start time.
    fn start_span(
        &self,
        name: &str,
        parent: &Self::Span,
        start: Timestamp,
    ) -> Result<Self::Span, SinkError>;

    /// Attach a string attribute to an open span.
    fn set_attribute(&self, span: &Self::Span, key: &str, value: &str) -> Result<(), SinkError>;

    /// End a span with an explicit end time.
    fn end_span(&self, span: &Self::Span, end: Timestamp) -> Result<(), SinkError>;
}
