//! Sampling filter: veto sampling for spans matching a predicate, delegate
//! everything else to a wrapped base sampler.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use opentelemetry::trace::{Link, SamplingDecision, SamplingResult, SpanKind, TraceId, TraceState};
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::trace::ShouldSample;
use opentelemetry_semantic_conventions::attribute::HTTP_ROUTE;

/// Exclusion predicate evaluated against candidate span metadata before the
/// base sampler runs. Returning `true` drops the span unconditionally.
pub type ExcludeFn = fn(name: &str, kind: &SpanKind, attributes: &[KeyValue]) -> bool;

/// A sampler that drops spans matching an exclusion predicate and otherwise
/// returns the wrapped sampler's decision unchanged.
///
/// The decision is computed once per span start and never revisited. If the
/// predicate panics the filter fails open: the span is *not* excluded and the
/// delegate decides, so a buggy predicate can never silently drop all
/// telemetry.
#[derive(Clone)]
pub struct FilterSampler {
    exclude: ExcludeFn,
    delegate: Box<dyn ShouldSample>,
}

impl FilterSampler {
    pub fn new<S>(exclude: ExcludeFn, delegate: S) -> Self
    where
        S: ShouldSample + 'static,
    {
        Self {
            exclude,
            delegate: Box::new(delegate),
        }
    }

    /// The filter used by whisker services: drop SERVER spans for the
    /// `/health` liveness route so probe traffic never reaches the exporters.
    pub fn ignore_health_checks<S>(delegate: S) -> Self
    where
        S: ShouldSample + 'static,
    {
        Self::new(is_health_check, delegate)
    }
}

impl ShouldSample for FilterSampler {
    fn should_sample(
        &self,
        parent_context: Option<&Context>,
        trace_id: TraceId,
        name: &str,
        span_kind: &SpanKind,
        attributes: &[KeyValue],
        links: &[Link],
    ) -> SamplingResult {
        let excluded = catch_unwind(AssertUnwindSafe(|| {
            (self.exclude)(name, span_kind, attributes)
        }))
        .unwrap_or_else(|_| {
            tracing::warn!(span_name = name, "sampling predicate panicked, failing open");
            false
        });

        if excluded {
            return SamplingResult {
                decision: SamplingDecision::Drop,
                attributes: Vec::new(),
                trace_state: TraceState::default(),
            };
        }

        self.delegate
            .should_sample(parent_context, trace_id, name, span_kind, attributes, links)
    }
}

impl fmt::Debug for FilterSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FilterSampler({:?})", self.delegate)
    }
}

/// True for SERVER spans whose `http.route` attribute is `/health`.
///
/// Missing attributes never match, so spans without route information are
/// always handed to the base sampler.
pub fn is_health_check(_name: &str, kind: &SpanKind, attributes: &[KeyValue]) -> bool {
    *kind == SpanKind::Server
        && attributes
            .iter()
            .any(|kv| kv.key.as_str() == HTTP_ROUTE && kv.value.as_str() == "/health")
}
