//! Whisker server: example HTTP service demonstrating health-check-filtered
//! distributed tracing with an in-memory CRUD resource and a self-calling
//! test endpoint.

mod cats;
mod config;
mod server;
mod trace;

use std::sync::Arc;
use std::time::Duration;

use cats::CatStore;
use config::AppConfig;
use server::AppState;
use whisker_tracing::TracingHandle;

fn main() -> anyhow::Result<()> {
    // Determine config path
    let config_path = {
        let args: Vec<String> = std::env::args().collect();
        // Check for --config flag first
        args.iter()
            .position(|a| a == "--config")
            .and_then(|i| args.get(i + 1).cloned())
            // Fall back to positional arg
            .or_else(|| args.get(1).filter(|a| !a.starts_with('-')).cloned())
            .or_else(|| std::env::var("WHISKER_CONFIG").ok())
            .unwrap_or_else(|| "whisker.toml".to_string())
    };

    // Load configuration
    let config = AppConfig::load(&config_path)?;

    // Build the tokio runtime first — the tonic gRPC exporter needs a reactor context
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let telemetry = Arc::new(whisker_tracing::init_tracing(&config.tracing));

        tracing::info!(
            config_path = %config_path,
            listen_address = %config.server.listen_address,
            exporters = ?config.tracing.exporters,
            "Starting whisker-server"
        );

        run(config, telemetry).await
    })
}

async fn run(config: AppConfig, telemetry: Arc<TracingHandle>) -> anyhow::Result<()> {
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    let state = AppState {
        config,
        http_client,
        telemetry,
        cats: CatStore::default(),
    };

    server::run(state).await
}
