//! Span exporter adapter: one uniform type over the supported backends.

use std::time::Duration;

use anyhow::{Context as _, Result};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::error::OTelSdkResult;
use opentelemetry_sdk::trace::{SpanData, SpanExporter};
use opentelemetry_sdk::Resource;

use crate::config::{ExporterKind, OtlpProtocol, TracingConfig};

const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";
const DEFAULT_ZIPKIN_ENDPOINT: &str = "http://localhost:9411/api/v2/spans";

/// A finished-span sink selected by configuration.
///
/// Every variant accepts batches of ended spans through the same
/// [`SpanExporter`] interface, so the provider can fan a span out to any mix
/// of backends without caring which ones are configured.
#[derive(Debug)]
pub enum TraceExporter {
    Console(opentelemetry_stdout::SpanExporter),
    Zipkin(opentelemetry_zipkin::ZipkinExporter),
    Otlp(opentelemetry_otlp::SpanExporter),
}

impl TraceExporter {
    /// Build the backend for `kind`, falling back to its conventional local
    /// endpoint when none is configured.
    ///
    /// `Jaeger` maps to the OTLP exporter: Jaeger ingests OTLP natively and
    /// the dedicated Jaeger exporter is retired upstream.
    pub fn build(kind: ExporterKind, config: &TracingConfig) -> Result<Self> {
        match kind {
            ExporterKind::Console => Ok(Self::Console(opentelemetry_stdout::SpanExporter::default())),
            ExporterKind::Zipkin => {
                let endpoint = config
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ZIPKIN_ENDPOINT.to_string());
                let exporter = opentelemetry_zipkin::ZipkinExporter::builder()
                    .with_collector_endpoint(&endpoint)
                    .build()
                    .context("building zipkin exporter")?;
                Ok(Self::Zipkin(exporter))
            }
            ExporterKind::Otlp | ExporterKind::Jaeger => {
                let endpoint = config
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OTLP_ENDPOINT.to_string());
                let exporter = match config.protocol {
                    OtlpProtocol::Grpc => opentelemetry_otlp::SpanExporter::builder()
                        .with_tonic()
                        .with_endpoint(&endpoint)
                        .build()
                        .context("building otlp grpc exporter")?,
                    OtlpProtocol::Http => opentelemetry_otlp::SpanExporter::builder()
                        .with_http()
                        .with_endpoint(&endpoint)
                        .build()
                        .context("building otlp http exporter")?,
                };
                Ok(Self::Otlp(exporter))
            }
        }
    }
}

impl SpanExporter for TraceExporter {
    async fn export(&self, batch: Vec<SpanData>) -> OTelSdkResult {
        match self {
            Self::Console(e) => e.export(batch).await,
            Self::Zipkin(e) => e.export(batch).await,
            Self::Otlp(e) => e.export(batch).await,
        }
    }

    fn shutdown_with_timeout(&mut self, timeout: Duration) -> OTelSdkResult {
        match self {
            Self::Console(e) => e.shutdown_with_timeout(timeout),
            Self::Zipkin(e) => e.shutdown_with_timeout(timeout),
            Self::Otlp(e) => e.shutdown_with_timeout(timeout),
        }
    }

    fn force_flush(&mut self) -> OTelSdkResult {
        match self {
            Self::Console(e) => e.force_flush(),
            Self::Zipkin(e) => e.force_flush(),
            Self::Otlp(e) => e.force_flush(),
        }
    }

    fn set_resource(&mut self, resource: &Resource) {
        match self {
            Self::Console(e) => e.set_resource(resource),
            Self::Zipkin(e) => e.set_resource(resource),
            Self::Otlp(e) => e.set_resource(resource),
        }
    }
}
