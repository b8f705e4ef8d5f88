//! Decision threshold resolution
//!
//! Each source is a [`ThresholdResolver`] that either has an opinion
//! (`Ok(Some(value))`), has none (`Ok(None)`), or is broken (`Err`). Resolvers
//! are consulted highest-precedence first and the first opinion wins. A broken
//! source is logged and treated as having no opinion.

use crate::artifacts::metadata::ModelMetadata;
use crate::error::ThresholdError;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Recall-oriented threshold tuned on the imbalanced training set
pub const DEFAULT_THRESHOLD: f64 = 0.10;

/// Where the resolved threshold came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdSource {
    Metadata,
    Artifact,
    Default,
}

/// A single source of a decision threshold
pub trait ThresholdResolver {
    fn source(&self) -> ThresholdSource;

    fn resolve(&self) -> Result<Option<f64>, ThresholdError>;
}

/// `threshold` field of the model metadata
pub struct MetadataThreshold<'a> {
    metadata: &'a ModelMetadata,
}

impl<'a> MetadataThreshold<'a> {
    pub fn new(metadata: &'a ModelMetadata) -> Self {
        Self { metadata }
    }
}

impl ThresholdResolver for MetadataThreshold<'_> {
    fn source(&self) -> ThresholdSource {
        ThresholdSource::Metadata
    }

    fn resolve(&self) -> Result<Option<f64>, ThresholdError> {
        match &self.metadata.threshold {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_f64()
                .ok_or_else(|| ThresholdError::Unparseable(n.to_string()))
                .and_then(check_range)
                .map(Some),
            Some(Value::String(s)) => parse_scalar(s).map(Some),
            Some(other) => Err(ThresholdError::Unparseable(other.to_string())),
        }
    }
}

/// Standalone threshold artifact holding one serialized scalar
pub struct ThresholdArtifact {
    path: Option<PathBuf>,
}

impl ThresholdArtifact {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl ThresholdResolver for ThresholdArtifact {
    fn source(&self) -> ThresholdSource {
        ThresholdSource::Artifact
    }

    fn resolve(&self) -> Result<Option<f64>, ThresholdError> {
        let Some(path) = &self.path else {
            return Ok(None);
        };
        let text = std::fs::read_to_string(path).map_err(|source| ThresholdError::Io {
            path: path.clone(),
            source,
        })?;
        parse_scalar(&text).map(Some)
    }
}

/// Built-in fallback; always has an opinion
pub struct FixedThreshold(pub f64);

impl ThresholdResolver for FixedThreshold {
    fn source(&self) -> ThresholdSource {
        ThresholdSource::Default
    }

    fn resolve(&self) -> Result<Option<f64>, ThresholdError> {
        check_range(self.0).map(Some)
    }
}

/// Outcome of resolution
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedThreshold {
    pub value: f64,
    pub source: ThresholdSource,
}

/// Consult `resolvers` in order; the first opinion wins.
///
/// Falls back to [`DEFAULT_THRESHOLD`] if no resolver has a usable value.
pub fn resolve_threshold(resolvers: &[&dyn ThresholdResolver]) -> ResolvedThreshold {
    for resolver in resolvers {
        match resolver.resolve() {
            Ok(Some(value)) => {
                debug!(source = ?resolver.source(), threshold = value, "Threshold resolved");
                return ResolvedThreshold {
                    value,
                    source: resolver.source(),
                };
            }
            Ok(None) => {}
            Err(e) => {
                warn!(source = ?resolver.source(), error = %e, "Ignoring threshold source");
            }
        }
    }

    ResolvedThreshold {
        value: DEFAULT_THRESHOLD,
        source: ThresholdSource::Default,
    }
}

/// Parse a serialized scalar: bare text or a JSON number/string
fn parse_scalar(text: &str) -> Result<f64, ThresholdError> {
    let trimmed = text.trim();
    let value = match trimmed.parse::<f64>() {
        Ok(v) => v,
        Err(_) => match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| ThresholdError::Unparseable(s.clone()))?,
            _ => return Err(ThresholdError::Unparseable(trimmed.to_string())),
        },
    };
    check_range(value)
}

fn check_range(value: f64) -> Result<f64, ThresholdError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ThresholdError::OutOfRange(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn metadata_with(threshold: Value) -> ModelMetadata {
        ModelMetadata {
            threshold: Some(threshold),
            ..Default::default()
        }
    }

    #[test]
    fn test_metadata_beats_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("best_threshold.json");
        fs::write(&path, "0.10").unwrap();

        let meta = metadata_with(Value::from(0.25));
        let resolved = resolve_threshold(&[
            &MetadataThreshold::new(&meta),
            &ThresholdArtifact::new(Some(path)),
            &FixedThreshold(DEFAULT_THRESHOLD),
        ]);

        assert_eq!(resolved.value, 0.25);
        assert_eq!(resolved.source, ThresholdSource::Metadata);
    }

    #[test]
    fn test_default_when_nothing_available() {
        let meta = ModelMetadata::default();
        let resolved = resolve_threshold(&[
            &MetadataThreshold::new(&meta),
            &ThresholdArtifact::new(None),
            &FixedThreshold(DEFAULT_THRESHOLD),
        ]);

        assert_eq!(resolved.value, 0.10);
        assert_eq!(resolved.source, ThresholdSource::Default);
    }

    #[test]
    fn test_malformed_sources_fall_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("best_threshold.json");
        fs::write(&path, "0.3").unwrap();

        let meta = metadata_with(Value::from("not-a-number"));
        let resolved = resolve_threshold(&[
            &MetadataThreshold::new(&meta),
            &ThresholdArtifact::new(Some(path.clone())),
            &FixedThreshold(DEFAULT_THRESHOLD),
        ]);
        assert_eq!(resolved.value, 0.3);
        assert_eq!(resolved.source, ThresholdSource::Artifact);

        fs::write(&path, "garbage").unwrap();
        let resolved = resolve_threshold(&[
            &MetadataThreshold::new(&meta),
            &ThresholdArtifact::new(Some(path)),
            &FixedThreshold(DEFAULT_THRESHOLD),
        ]);
        assert_eq!(resolved.value, 0.10);
    }

    #[test]
    fn test_out_of_range_is_no_opinion() {
        let meta = metadata_with(Value::from(1.5));
        let resolved = resolve_threshold(&[&MetadataThreshold::new(&meta), &FixedThreshold(0.2)]);

        assert_eq!(resolved.value, 0.2);
    }

    #[test]
    fn test_numeric_string_in_metadata() {
        let meta = metadata_with(Value::from(" 0.35 "));
        assert_eq!(MetadataThreshold::new(&meta).resolve().unwrap(), Some(0.35));
    }

    #[test]
    fn test_artifact_accepts_json_string() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("best_threshold.json");
        fs::write(&path, "\"0.15\"\n").unwrap();

        assert_eq!(ThresholdArtifact::new(Some(path)).resolve().unwrap(), Some(0.15));
    }
}
