use fever_risk::{
    api::{build_router, AppState},
    config::Config,
    ml::{ArtifactPaths, PredictorService},
    telemetry,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });

    // Initialize tracing
    telemetry::init_tracing(&config.observability);

    tracing::info!(
        "Starting {} v{}",
        config.observability.service_name,
        env!("CARGO_PKG_VERSION")
    );

    // Load models; a failure leaves the service up in degraded mode
    let paths = ArtifactPaths::new(&config.artifacts.model_dir);
    let predictor = Arc::new(PredictorService::load(&paths));
    if !predictor.is_ready() {
        tracing::warn!("⚠️  Serving without models, /predict will return an error object");
    }

    let app = build_router(AppState::new(predictor));

    // Start HTTP server
    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("🚀 HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Predict: POST http://{}/predict", http_addr);
    tracing::info!("   Self-test: http://{}/predict/test", http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    tracing::info!("Shutting down gracefully...");
    Ok(())
}
