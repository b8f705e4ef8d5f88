//! HTTP error mapping

use crate::error::ScoringError;
use crate::inference::PredictError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    /// Form input that does not parse or falls outside the accepted ranges
    Validation(String),
    /// Rows do not fit the trained pipeline
    SchemaMismatch(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::SchemaMismatch(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<ScoringError> for ApiError {
    fn from(err: ScoringError) -> Self {
        match err {
            ScoringError::SchemaMismatch(_) => ApiError::SchemaMismatch(err.to_string()),
            ScoringError::OutputShape { .. } | ScoringError::Runtime(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<PredictError> for ApiError {
    fn from(err: PredictError) -> Self {
        match err {
            PredictError::Validation(e) => ApiError::Validation(e.to_string()),
            PredictError::Scoring(e) => e.into(),
        }
    }
}
