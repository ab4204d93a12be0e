//! Tracer provider setup and the process-wide tracing handle.

use std::borrow::Cow;
use std::fmt::Display;
use std::future::Future;

use opentelemetry::trace::{SpanKind, TraceContextExt, Tracer, TracerProvider as _};
use opentelemetry::{global, Context, KeyValue};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{Sampler, SdkTracer, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::{ExporterKind, TracingConfig};
use crate::exporter::TraceExporter;
use crate::sampler::FilterSampler;
use crate::spans;

/// Handle to the configured tracer provider.
///
/// Constructed once at startup and immutable afterwards; concurrent reads
/// need no locking. Holds the provider so pending spans are flushed when the
/// handle is dropped at shutdown.
pub struct TracingHandle {
    provider: SdkTracerProvider,
    tracer: SdkTracer,
}

impl TracingHandle {
    /// Wrap an already-built provider. Used by [`init_tracing`] and by tests
    /// that assemble providers over in-memory exporters.
    pub fn from_provider(provider: SdkTracerProvider, service_name: impl Into<String>) -> Self {
        let tracer = provider.tracer(service_name.into());
        Self { provider, tracer }
    }

    pub fn tracer(&self) -> &SdkTracer {
        &self.tracer
    }

    /// Start a span as a child of `parent` and return the derived context
    /// carrying it as the active span.
    ///
    /// Attributes must be supplied here, not after the fact: the sampler only
    /// sees what is present at span creation.
    pub fn start_span(
        &self,
        name: impl Into<Cow<'static, str>>,
        kind: SpanKind,
        attributes: Vec<KeyValue>,
        parent: &Context,
    ) -> Context {
        let span = self
            .tracer
            .span_builder(name)
            .with_kind(kind)
            .with_attributes(attributes)
            .start_with_context(&self.tracer, parent);
        parent.with_span(span)
    }

    /// See [`spans::with_client_span`].
    pub async fn with_client_span<F, Fut, T, E>(
        &self,
        name: impl Into<Cow<'static, str>>,
        parent: &Context,
        op: F,
    ) -> Result<T, E>
    where
        F: FnOnce(Context) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        spans::with_client_span(&self.tracer, name, parent, op).await
    }

    /// Flush spans still buffered in the registered processors.
    pub fn force_flush(&self) {
        if let Err(e) = self.provider.force_flush() {
            tracing::warn!(error = %e, "failed to flush tracer provider");
        }
    }
}

impl Drop for TracingHandle {
    fn drop(&mut self) {
        if let Err(e) = self.provider.shutdown() {
            eprintln!("Failed to shutdown tracer provider: {e}");
        }
    }
}

/// Initialize the tracing subsystem: provider, sampler, exporters, W3C
/// propagation, and the fmt/OTel subscriber stack.
///
/// Every configured exporter gets its own span processor, so each ended span
/// fans out to all of them. An exporter that fails to build is logged and
/// skipped; telemetry problems must never keep the service from starting.
///
/// Returns a [`TracingHandle`] that must be held for the lifetime of the
/// application so traces are flushed on shutdown.
pub fn init_tracing(config: &TracingConfig) -> TracingHandle {
    let (handle, failures) = build_tracing(config);

    global::set_text_map_propagator(TraceContextPropagator::new());

    let env_filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(tracing_opentelemetry::layer().with_tracer(handle.tracer().clone()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .with(env_filter)
        .init();

    for (kind, error) in failures {
        tracing::warn!(
            exporter = ?kind,
            error = %error,
            "exporter failed to initialize, skipping"
        );
    }

    tracing::info!(
        service = %config.service_name,
        exporters = ?config.exporters,
        "tracing initialized"
    );

    handle
}

/// Assemble the provider without touching global subscriber state.
fn build_tracing(config: &TracingConfig) -> (TracingHandle, Vec<(ExporterKind, anyhow::Error)>) {
    let mut failures = Vec::new();

    let mut builder = SdkTracerProvider::builder()
        .with_sampler(FilterSampler::ignore_health_checks(Sampler::AlwaysOn))
        .with_resource(
            Resource::builder_empty()
                .with_service_name(config.service_name.clone())
                .build(),
        );

    for kind in &config.exporters {
        match TraceExporter::build(*kind, config) {
            // Console writes are cheap and synchronous; network backends get
            // the batch processor so export never blocks the request path.
            Ok(exporter) => {
                builder = match kind {
                    ExporterKind::Console => builder.with_simple_exporter(exporter),
                    _ => builder.with_batch_exporter(exporter),
                };
            }
            Err(e) => failures.push((*kind, e)),
        }
    }

    let provider = builder.build();
    let handle = TracingHandle::from_provider(provider, config.service_name.clone());
    (handle, failures)
}
