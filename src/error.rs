//! Error taxonomy for artifact loading and scoring

use std::path::PathBuf;

use thiserror::Error;

use crate::artifacts::locator::ArtifactKind;

/// Setup-time failures. Any of these blocks all predictions.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// No candidate path exists for a required artifact
    #[error("{kind} artifact not found (searched: {searched})")]
    NotFound { kind: ArtifactKind, searched: String },

    /// The pipeline file exists but could not be turned into a usable pipeline
    #[error(
        "failed to load pipeline artifact {}: {reason}. \
         Training-time versions recorded in metadata: {versions}",
        path.display()
    )]
    LoadFailure {
        path: PathBuf,
        reason: String,
        versions: String,
    },
}

/// Malformed or unreadable metadata. Always recovered by the loader.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to read metadata: {0}")]
    Io(#[from] std::io::Error),

    #[error("metadata is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("metadata root is not a JSON object")]
    NotAnObject,
}

/// A threshold source that exists but yields no usable value.
/// Always recovered by falling through to the next resolver.
#[derive(Debug, Error)]
pub enum ThresholdError {
    #[error("failed to read threshold artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("threshold value {0:?} is not a number")]
    Unparseable(String),

    #[error("threshold {0} is outside [0, 1]")]
    OutOfRange(f64),
}

/// Per-request failures at the scoring boundary.
#[derive(Debug, Error)]
pub enum ScoringError {
    /// The prepared feature row does not fit what the pipeline was trained on
    #[error("feature schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("pipeline returned {got} probability rows for {expected} input rows")]
    OutputShape { expected: usize, got: usize },

    #[error("model runtime error: {0}")]
    Runtime(String),
}

/// Form input outside the accepted ranges
#[derive(Debug, Error, PartialEq)]
#[error("invalid {field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}
