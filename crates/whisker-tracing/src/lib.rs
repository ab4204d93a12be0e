//! Reusable OpenTelemetry tracing library for whisker services.
//!
//! Wires a service-name resource, a health-check-filtering sampler, and one
//! or more span exporters (console, Zipkin, OTLP, Jaeger) into a single
//! tracer provider, and provides a scoped helper for CLIENT spans around
//! outbound calls.

pub mod config;
pub mod exporter;
pub mod provider;
pub mod sampler;
pub mod spans;

pub use config::{ExporterKind, OtlpProtocol, TracingConfig};
pub use exporter::TraceExporter;
pub use provider::{init_tracing, TracingHandle};
pub use sampler::FilterSampler;
pub use spans::with_client_span;
