//! HTTP surface over the inference engine

pub mod error;
pub mod handlers;

pub use error::{ApiError, ApiResult};

use crate::inference::InferenceEngine;
use crate::metrics::PredictionMetrics;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<InferenceEngine>,
    pub metrics: Arc<PredictionMetrics>,
}

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/model", get(handlers::model_info))
        .route("/api/v1/predict", post(handlers::predict))
        .route("/api/v1/score", post(handlers::score))
        .route("/api/v1/stats", get(handlers::stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
