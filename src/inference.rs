//! Per-request inference: feature engineering, category alignment, scoring

use crate::artifacts::ArtifactRegistry;
use crate::category_aligner::{CategoryAligner, UnknownCategoryPolicy};
use crate::error::{ScoringError, ValidationError};
use crate::feature_engineer::FeatureEngineer;
use crate::scorer::Scorer;
use crate::types::{FeatureRow, Prediction, ScoredRow, TransactionRecord};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Why a single prediction request failed
#[derive(Debug, Error)]
pub enum PredictError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

/// Turns raw rows into scored rows using the shared artifacts
pub struct InferenceEngine {
    registry: Arc<ArtifactRegistry>,
    engineer: FeatureEngineer,
    aligner: CategoryAligner,
    scorer: Scorer,
}

impl InferenceEngine {
    pub fn new(registry: Arc<ArtifactRegistry>, policy: UnknownCategoryPolicy) -> Self {
        let engineer = FeatureEngineer::new(registry.category_probs());
        let scorer = Scorer::new(registry.threshold().value);
        Self {
            registry,
            engineer,
            aligner: CategoryAligner::new(policy),
            scorer,
        }
    }

    pub fn registry(&self) -> &ArtifactRegistry {
        &self.registry
    }

    pub fn threshold(&self) -> f64 {
        self.scorer.threshold()
    }

    /// Derive, align and score a batch of raw rows
    pub fn predict_rows(&self, rows: &[FeatureRow]) -> Result<Vec<ScoredRow>, ScoringError> {
        let pipeline = self.registry.pipeline();
        let descriptor = pipeline.preprocessing();

        let prepared: Vec<FeatureRow> = rows
            .iter()
            .map(|raw| self.aligner.align(&self.engineer.derive(raw), descriptor))
            .collect();

        debug!(
            rows = prepared.len(),
            aligned = descriptor.is_some(),
            "Feature rows prepared"
        );

        self.scorer.score(&prepared, pipeline)
    }

    /// Validate and score one form submission
    pub fn predict(&self, record: &TransactionRecord) -> Result<Prediction, PredictError> {
        record.validate()?;

        let scored = self.predict_rows(&[record.to_row()])?;
        let scored = scored.into_iter().next().ok_or(ScoringError::OutputShape {
            expected: 1,
            got: 0,
        })?;

        Ok(Prediction::new(
            scored.fraud_proba,
            scored.fraud_pred,
            self.threshold(),
        ))
    }
}
