//! SERVER-span middleware: one span per request, named after the matched
//! route, with trace context extracted from incoming headers.

use std::sync::Arc;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use opentelemetry::trace::{FutureExt, SpanKind, Status, TraceContextExt};
use opentelemetry::{global, KeyValue};
use opentelemetry_http::HeaderExtractor;
use opentelemetry_semantic_conventions::attribute::{
    HTTP_REQUEST_METHOD, HTTP_RESPONSE_STATUS_CODE, HTTP_ROUTE,
};

use crate::server::AppState;

/// Wrap the request in a SERVER span and run the inner service under it.
///
/// The route and method attributes are set at span creation so the sampler
/// can see them — that is the contract that lets the health-check filter
/// recognize `/health` traffic. The handler runs with the span's context
/// installed, so spans it starts become children of this one.
pub async fn trace_http(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());
    let method = request.method().as_str().to_owned();

    // Chain to a caller's span when traceparent headers are present.
    let parent = global::get_text_map_propagator(|propagator| {
        propagator.extract(&HeaderExtractor(request.headers()))
    });

    let cx = state.telemetry.start_span(
        format!("{method} {route}"),
        SpanKind::Server,
        vec![
            KeyValue::new(HTTP_ROUTE, route),
            KeyValue::new(HTTP_REQUEST_METHOD, method),
        ],
        &parent,
    );

    let response = next.run(request).with_context(cx.clone()).await;

    let status = response.status();
    cx.span().set_attribute(KeyValue::new(
        HTTP_RESPONSE_STATUS_CODE,
        i64::from(status.as_u16()),
    ));
    if status.is_server_error() {
        cx.span().set_status(Status::error(status.to_string()));
    }
    cx.span().end();

    response
}
