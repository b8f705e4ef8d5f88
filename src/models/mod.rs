//! Trained pipeline abstractions and the artifact formats behind them
//!
//! The scoring path never depends on how a pipeline is stored. It sees a
//! [`Pipeline`] that turns feature rows into class probabilities, and,
//! optionally, a [`PreprocessingDescriptor`] exposing the category
//! vocabularies the encoder was fit on.

pub mod classifier;
pub mod loader;
pub mod manifest;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod pipeline;

pub use loader::PipelineLoader;
pub use pipeline::ManifestPipeline;

use crate::error::ScoringError;
use crate::types::FeatureRow;
use serde::Serialize;

/// Index of the fraud class in a probability pair
pub const FRAUD_CLASS: usize = 1;

/// A categorical column and the vocabulary its encoder memorized, in the
/// encoder's stored order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalColumn {
    pub column: String,
    pub categories: Vec<String>,
}

/// What the preprocessing stage reveals about its categorical encoding
pub trait PreprocessingDescriptor {
    fn categorical_columns(&self) -> &[CategoricalColumn];
}

/// A trained preprocessing + classification pipeline.
///
/// Loaded once and shared read-only across concurrent requests.
pub trait Pipeline: Send + Sync {
    /// Per row, `[P(legitimate), P(fraud)]`
    fn predict_proba(&self, rows: &[FeatureRow]) -> Result<Vec<[f64; 2]>, ScoringError>;

    /// `None` when the preprocessing shape is not recognized
    fn preprocessing(&self) -> Option<&dyn PreprocessingDescriptor>;

    /// Short description for logs and the model info endpoint
    fn describe(&self) -> String;
}
