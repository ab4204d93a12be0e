//! Tracing configuration types.

use serde::Deserialize;

/// Configuration for the OpenTelemetry tracing subsystem.
#[derive(Debug, Clone, Deserialize)]
pub struct TracingConfig {
    /// The service name reported in the trace resource.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Span export backends. Every ended span is delivered to each of them.
    #[serde(default = "default_exporters")]
    pub exporters: Vec<ExporterKind>,

    /// Collector endpoint (e.g. "http://localhost:4317").
    /// When `None`, each exporter kind falls back to its conventional local
    /// endpoint.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Transport protocol for OTLP export.
    #[serde(default)]
    pub protocol: OtlpProtocol,

    /// Log level filter (e.g. "info", "debug", "whisker_server=debug,info").
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Span export backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExporterKind {
    /// Print finished spans to stdout.
    Console,
    /// Zipkin collector (JSON over HTTP).
    Zipkin,
    /// OTLP collector.
    Otlp,
    /// Jaeger, via its native OTLP ingest.
    Jaeger,
}

/// OTLP transport protocol.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OtlpProtocol {
    #[default]
    Grpc,
    Http,
}

fn default_service_name() -> String {
    "whisker-server".to_string()
}

fn default_exporters() -> Vec<ExporterKind> {
    vec![ExporterKind::Console]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            exporters: default_exporters(),
            endpoint: None,
            protocol: OtlpProtocol::default(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_console_only() {
        let config = TracingConfig::default();
        assert_eq!(config.exporters, vec![ExporterKind::Console]);
        assert_eq!(config.endpoint, None);
        assert_eq!(config.protocol, OtlpProtocol::Grpc);
    }

    #[test]
    fn deserializes_lowercase_exporter_kinds() {
        let config: TracingConfig = serde_json::from_str(
            r#"{
                "service_name": "svc",
                "exporters": ["console", "jaeger"],
                "endpoint": "http://collector:4317"
            }"#,
        )
        .unwrap();
        assert_eq!(config.service_name, "svc");
        assert_eq!(
            config.exporters,
            vec![ExporterKind::Console, ExporterKind::Jaeger]
        );
        assert_eq!(config.endpoint.as_deref(), Some("http://collector:4317"));
    }
}
