//! Request handlers

use crate::artifacts::registry::ArtifactSources;
use crate::artifacts::ResolvedThreshold;
use crate::metrics::MetricsSnapshot;
use crate::models::CategoricalColumn;
use crate::server::error::{ApiError, ApiResult};
use crate::server::AppState;
use crate::types::{FeatureRow, Prediction, TransactionRecord};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Instant;
use tracing::{debug, info};

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
    })
}

#[derive(Serialize)]
pub struct ModelInfo {
    pipeline: String,
    sources: ArtifactSources,
    threshold: ResolvedThreshold,
    /// Library versions recorded at training time
    versions: Map<String, Value>,
    categorical_columns: Vec<CategoricalColumn>,
}

pub async fn model_info(State(state): State<AppState>) -> Json<ModelInfo> {
    let registry = state.engine.registry();
    let pipeline = registry.pipeline();
    Json(ModelInfo {
        pipeline: pipeline.describe(),
        sources: registry.sources().clone(),
        threshold: registry.threshold(),
        versions: registry.metadata().versions.clone(),
        categorical_columns: pipeline
            .preprocessing()
            .map(|d| d.categorical_columns().to_vec())
            .unwrap_or_default(),
    })
}

pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<TransactionRecord>, JsonRejection>,
) -> ApiResult<Json<Prediction>> {
    let start = Instant::now();

    let Json(record) = payload.map_err(|rejection| {
        state.metrics.record_failure();
        ApiError::Validation(rejection.body_text())
    })?;

    let prediction = state.engine.predict(&record).map_err(|e| {
        state.metrics.record_failure();
        e
    })?;

    state
        .metrics
        .record_prediction(prediction.fraud_probability, prediction.prediction);
    state.metrics.record_latency(start.elapsed());

    info!(
        prediction_id = %prediction.prediction_id,
        fraud_probability = prediction.fraud_probability,
        verdict = ?prediction.verdict,
        latency_us = start.elapsed().as_micros(),
        "Prediction served"
    );

    Ok(Json(prediction))
}

#[derive(Deserialize)]
pub struct ScoreRequest {
    rows: Vec<FeatureRow>,
}

#[derive(Serialize)]
pub struct ScoreResponse {
    /// Input rows with `fraud_proba` and `fraud_pred` appended
    rows: Vec<FeatureRow>,
    threshold: f64,
    flagged: usize,
}

pub async fn score(
    State(state): State<AppState>,
    payload: Result<Json<ScoreRequest>, JsonRejection>,
) -> ApiResult<Json<ScoreResponse>> {
    let start = Instant::now();

    let Json(request) = payload.map_err(|rejection| {
        state.metrics.record_failure();
        ApiError::SchemaMismatch(rejection.body_text())
    })?;

    let scored = state.engine.predict_rows(&request.rows).map_err(|e| {
        state.metrics.record_failure();
        e
    })?;

    for row in &scored {
        state.metrics.record_prediction(row.fraud_proba, row.fraud_pred);
    }
    state.metrics.record_latency(start.elapsed());

    let flagged = scored.iter().filter(|s| s.fraud_pred == 1).count();
    debug!(rows = scored.len(), flagged = flagged, "Batch scored");

    Ok(Json(ScoreResponse {
        rows: scored.into_iter().map(|s| s.row).collect(),
        threshold: state.engine.threshold(),
        flagged,
    }))
}

pub async fn stats(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
