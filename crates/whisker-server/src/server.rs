//! Axum HTTP server: router, listener, graceful shutdown, handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use opentelemetry::{global, Context};
use opentelemetry_http::HeaderInjector;
use tower_http::cors::CorsLayer;
use whisker_tracing::TracingHandle;

use crate::cats::{self, CatStore};
use crate::config::AppConfig;
use crate::trace;

/// Shared application state.
pub struct AppState {
    pub config: AppConfig,
    pub http_client: reqwest::Client,
    pub telemetry: Arc<TracingHandle>,
    pub cats: CatStore,
}

/// Build the router with tracing and CORS layers applied.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/run_test", get(handle_run_test))
        .merge(cats::router(state.clone()))
        .layer(middleware::from_fn_with_state(state.clone(), trace::trace_http))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Build and run the HTTP server.
pub async fn run(state: AppState) -> anyhow::Result<()> {
    let listen_addr = state.config.server.listen_address.clone();
    let app = app(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "Whisker server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Whisker server shut down gracefully");
    Ok(())
}

async fn handle_root() -> &'static str {
    "Hello, World!"
}

/// Health check endpoint, called by the framework/cluster. Its SERVER span
/// carries `http.route = "/health"` and is dropped by the sampling filter.
async fn handle_health() -> impl IntoResponse {
    (StatusCode::OK, "HEALTHY")
}

/// Calls this server's own /cats endpoint, somewhat mimicking an external
/// API call, under a CLIENT span chained to the incoming request's span.
async fn handle_run_test(State(state): State<Arc<AppState>>) -> Response {
    // The SERVER span installed by the middleware.
    let parent = Context::current();

    let url = format!("{}/cats", state.config.server.self_base_url());
    let client = state.http_client.clone();
    let token = state.config.auth.token.clone();

    let created = state
        .telemetry
        .with_client_span("POST /cats", &parent, |cx| async move {
            // Propagate the CLIENT span to the callee over traceparent headers.
            let mut headers = http::HeaderMap::new();
            global::get_text_map_propagator(|propagator| {
                propagator.inject_context(&cx, &mut HeaderInjector(&mut headers))
            });

            let response = client
                .post(&url)
                .headers(headers)
                .header(http::header::AUTHORIZATION, token)
                .json(&serde_json::json!({ "name": "Tom", "friends": ["Jerry"] }))
                .send()
                .await?
                .error_for_status()?;

            let body: serde_json::Value = response.json().await?;
            anyhow::Ok(body)
        })
        .await;

    match created {
        Ok(cat) => (StatusCode::CREATED, Json(cat)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "self-call to /cats failed");
            (StatusCode::BAD_GATEWAY, "self-call to /cats failed").into_response()
        }
    }
}

/// Wait for SIGINT (Ctrl+C) for graceful shutdown.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C signal handler");
    tracing::info!("Shutdown signal received, draining connections...");
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::future::IntoFuture;

    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use opentelemetry::trace::{SpanKind, Status};
    use opentelemetry_sdk::propagation::TraceContextPropagator;
    use opentelemetry_sdk::trace::{InMemorySpanExporter, Sampler, SdkTracerProvider};
    use tower::ServiceExt;
    use whisker_tracing::FilterSampler;

    use crate::config::ServerConfig;

    fn test_state(exporter: &InMemorySpanExporter, listen_address: &str) -> Arc<AppState> {
        let provider = SdkTracerProvider::builder()
            .with_sampler(FilterSampler::ignore_health_checks(Sampler::AlwaysOn))
            .with_simple_exporter(exporter.clone())
            .build();
        let telemetry = Arc::new(TracingHandle::from_provider(provider, "whisker-test"));

        let config = AppConfig {
            server: ServerConfig {
                listen_address: listen_address.to_string(),
            },
            ..Default::default()
        };

        Arc::new(AppState {
            config,
            http_client: reqwest::Client::new(),
            telemetry,
            cats: CatStore::default(),
        })
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn root_says_hello() {
        let exporter = InMemorySpanExporter::default();
        let app = app(test_state(&exporter, "127.0.0.1:0"));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "Hello, World!");
    }

    #[tokio::test]
    async fn health_returns_healthy_and_exports_no_span() {
        let exporter = InMemorySpanExporter::default();
        let app = app(test_state(&exporter, "127.0.0.1:0"));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "HEALTHY");

        // The span was created and ended, but the filter dropped it.
        assert!(exporter.get_finished_spans().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cats_require_the_token() {
        let exporter = InMemorySpanExporter::default();
        let state = test_state(&exporter, "127.0.0.1:0");

        let response = app(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/cats")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"Tom"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/cats")
                    .header("authorization", "secret_token")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"Tom"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/cats")
                    .header("authorization", "secret_token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cats: Vec<serde_json::Value> =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(cats.len(), 1);
        assert_eq!(cats[0]["name"], "Tom");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_test_chains_spans_across_the_self_call() {
        global::set_text_map_propagator(TraceContextPropagator::new());

        let exporter = InMemorySpanExporter::default();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = test_state(&exporter, &addr.to_string());

        tokio::spawn(axum::serve(listener, app(state)).into_future());

        let response = reqwest::get(format!("http://{addr}/run_test"))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        let created: serde_json::Value = response.json().await.unwrap();
        assert_eq!(created["name"], "Tom");

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans.len(), 3);

        let outer = spans
            .iter()
            .find(|s| s.name == "GET /run_test" && s.span_kind == SpanKind::Server)
            .unwrap();
        let client = spans
            .iter()
            .find(|s| s.name == "POST /cats" && s.span_kind == SpanKind::Client)
            .unwrap();
        let inner = spans
            .iter()
            .find(|s| s.name == "POST /cats" && s.span_kind == SpanKind::Server)
            .unwrap();

        // One trace end to end, each span parented to the previous hop.
        let trace_id = outer.span_context.trace_id();
        assert_eq!(client.span_context.trace_id(), trace_id);
        assert_eq!(inner.span_context.trace_id(), trace_id);
        assert_eq!(client.parent_span_id, outer.span_context.span_id());
        assert_eq!(inner.parent_span_id, client.span_context.span_id());
        assert_eq!(client.status, Status::Ok);
    }
}
