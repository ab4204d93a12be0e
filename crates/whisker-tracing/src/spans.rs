//! Scoped span helpers for instrumenting outbound calls.

use std::borrow::Cow;
use std::fmt::Display;
use std::future::Future;

use opentelemetry::trace::{SpanKind, Status, TraceContextExt, Tracer};
use opentelemetry::Context;
use opentelemetry_sdk::trace::SdkTracer;

/// Run `op` under a new CLIENT span that is a child of `parent`.
///
/// The span is installed in a derived context handed to `op`, so nested
/// spans and injected headers chain to it. On `Ok` the span status is set to
/// OK, on `Err` to ERROR with the error's message, and the span is ended in
/// one place on both paths. The span itself lives in the derived context, so
/// even if `op` panics the SDK ends it on drop; a second `end()` on an
/// already-ended span is a no-op, never an error.
pub async fn with_client_span<F, Fut, T, E>(
    tracer: &SdkTracer,
    name: impl Into<Cow<'static, str>>,
    parent: &Context,
    op: F,
) -> Result<T, E>
where
    F: FnOnce(Context) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let span = tracer
        .span_builder(name)
        .with_kind(SpanKind::Client)
        .start_with_context(tracer, parent);
    let cx = parent.with_span(span);

    let result = op(cx.clone()).await;

    match &result {
        Ok(_) => cx.span().set_status(Status::Ok),
        Err(e) => cx.span().set_status(Status::error(e.to_string())),
    }
    cx.span().end();

    result
}
