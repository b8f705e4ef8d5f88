//! Payment Fraud Scoring - Main Entry Point
//!
//! Loads the trained artifacts once, then serves predictions over HTTP
//! until Ctrl-C.

use anyhow::{Context, Result};
use payment_fraud_scoring::{
    artifacts::{ArtifactLocator, ArtifactRegistry},
    config::{AppConfig, LoggingConfig},
    inference::InferenceEngine,
    metrics::{MetricsReporter, PredictionMetrics},
    models::PipelineLoader,
    server::{create_router, AppState},
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting Payment Fraud Scoring service");
    info!(
        base_dir = %config.artifacts.base_dir,
        default_threshold = config.artifacts.default_threshold,
        unknown_category = ?config.aligner.unknown_category,
        "Configuration loaded successfully"
    );

    // Artifacts are loaded once; a failure here blocks all predictions
    let locator = ArtifactLocator::from_config(&config.artifacts);
    let registry = ArtifactRegistry::load(
        &locator,
        &PipelineLoader::new(),
        config.artifacts.default_threshold,
    )
    .map_err(|e| {
        error!(error = %e, "Failed to load artifacts");
        e
    })?;
    info!(
        pipeline = %registry.pipeline().describe(),
        threshold = registry.threshold().value,
        "Artifact registry ready"
    );

    let engine = Arc::new(InferenceEngine::new(
        Arc::new(registry),
        config.aligner.unknown_category.clone(),
    ));
    let metrics = Arc::new(PredictionMetrics::new());

    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let app = create_router(AppState {
        engine,
        metrics: metrics.clone(),
    });

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!("Listening on http://{}", config.server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("payment_fraud_scoring={},tower_http=info", logging.level)))
        .context("Invalid log level")?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.pretty().init();
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
