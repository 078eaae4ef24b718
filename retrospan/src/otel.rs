//! OpenTelemetry adapter for [`SpanSink`].
//!
//! Maps the sink boundary onto any `opentelemetry::trace::Tracer`. Span
//! handles are `Context` values carrying the active span, so parent linking
//! works the same way OTel context propagation does elsewhere in a service;
//! the interception layer obtains the initial parent handle from
//! `Context::current()` at entry. Synthesized spans are `INTERNAL` kind and
//! carry the explicit start/end timestamps reconstructed from sampling.
//!
//! The OTel API never fails span creation, so every method returns `Ok`;
//! export problems surface in the backend's own pipeline.

use opentelemetry::trace::{SpanBuilder, SpanKind, TraceContextExt, Tracer};
use opentelemetry::{Context, KeyValue};

use crate::domain::{SinkError, Timestamp};
use crate::sink::SpanSink;

pub struct OtelSpanSink<T> {
    tracer: T,
}

impl<T> OtelSpanSink<T> {
    pub fn new(tracer: T) -> Self {
        Self { tracer }
    }
}

impl<T> SpanSink for OtelSpanSink<T>
where
    T: Tracer + Send + Sync,
    T::Span: Send + Sync + 'static,
{
    type Span = Context;

    fn start_span(
        &self,
        name: &str,
        parent: &Context,
        start: Timestamp,
    ) -> Result<Context, SinkError> {
        let builder = SpanBuilder::from_name(name.to_owned())
            .with_kind(SpanKind::Internal)
            .with_start_time(start.as_system_time());
        let span = self.tracer.build_with_context(builder, parent);
        Ok(parent.with_span(span))
    }

    fn set_attribute(&self, span: &Context, key: &str, value: &str) -> Result<(), SinkError> {
        span.span().set_attribute(KeyValue::new(key.to_owned(), value.to_owned()));
        Ok(())
    }

    fn end_span(&self, span: &Context, end: Timestamp) -> Result<(), SinkError> {
        span.span().end_with_timestamp(end.as_system_time());
        Ok(())
    }
}
