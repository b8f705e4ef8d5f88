//! Process-wide artifact registry
//!
//! Built once at startup, then shared read-only (behind an `Arc`) by every
//! request handler. Nothing mutates it after construction, so concurrent
//! readers need no locking.

use crate::artifacts::locator::{ArtifactKind, ArtifactLocator};
use crate::artifacts::metadata::ModelMetadata;
use crate::artifacts::threshold::{
    resolve_threshold, FixedThreshold, MetadataThreshold, ResolvedThreshold, ThresholdArtifact,
};
use crate::error::ArtifactError;
use crate::feature_engineer::CategoryProbabilityMap;
use crate::models::{Pipeline, PipelineLoader};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Paths the registry was loaded from
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArtifactSources {
    pub pipeline: Option<PathBuf>,
    pub metadata: Option<PathBuf>,
    pub threshold: Option<PathBuf>,
}

/// The loaded (pipeline, metadata, threshold) triple
pub struct ArtifactRegistry {
    pipeline: Arc<dyn Pipeline>,
    metadata: ModelMetadata,
    threshold: ResolvedThreshold,
    sources: ArtifactSources,
}

impl ArtifactRegistry {
    /// Locate and load every artifact.
    ///
    /// Metadata is read first so a pipeline load failure can report the
    /// training-time library versions. Only the pipeline is required.
    pub fn load(
        locator: &ArtifactLocator,
        loader: &PipelineLoader,
        default_threshold: f64,
    ) -> Result<Self, ArtifactError> {
        let metadata_path = locator.locate(ArtifactKind::Metadata);
        let metadata = match &metadata_path {
            Some(path) => ModelMetadata::read(path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable metadata");
                ModelMetadata::default()
            }),
            None => {
                info!("No metadata artifact found, using defaults");
                ModelMetadata::default()
            }
        };

        let pipeline_path =
            locator
                .locate(ArtifactKind::Pipeline)
                .ok_or_else(|| ArtifactError::NotFound {
                    kind: ArtifactKind::Pipeline,
                    searched: locator.describe(ArtifactKind::Pipeline),
                })?;

        let pipeline = loader
            .load(&pipeline_path)
            .map_err(|e| ArtifactError::LoadFailure {
                path: pipeline_path.clone(),
                reason: format!("{:#}", e),
                versions: metadata.versions_hint(),
            })?;

        let threshold_path = locator.locate(ArtifactKind::Threshold);
        let threshold = resolve_threshold(&[
            &MetadataThreshold::new(&metadata),
            &ThresholdArtifact::new(threshold_path.clone()),
            &FixedThreshold(default_threshold),
        ]);

        info!(
            pipeline = %pipeline_path.display(),
            threshold = threshold.value,
            threshold_source = ?threshold.source,
            "Artifacts loaded"
        );

        Ok(Self {
            pipeline: Arc::new(pipeline),
            metadata,
            threshold,
            sources: ArtifactSources {
                pipeline: Some(pipeline_path),
                metadata: metadata_path,
                threshold: threshold_path,
            },
        })
    }

    /// Assemble a registry from already-loaded parts
    pub fn from_parts(
        pipeline: Arc<dyn Pipeline>,
        metadata: ModelMetadata,
        threshold: ResolvedThreshold,
    ) -> Self {
        Self {
            pipeline,
            metadata,
            threshold,
            sources: ArtifactSources::default(),
        }
    }

    pub fn pipeline(&self) -> &dyn Pipeline {
        self.pipeline.as_ref()
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn threshold(&self) -> ResolvedThreshold {
        self.threshold
    }

    pub fn sources(&self) -> &ArtifactSources {
        &self.sources
    }

    /// Category mapping from metadata, or the built-in default
    pub fn category_probs(&self) -> CategoryProbabilityMap {
        self.metadata
            .category_prob_map
            .as_ref()
            .and_then(|map| CategoryProbabilityMap::new(map.iter().map(|(k, v)| (k, *v))))
            .unwrap_or_default()
    }
}
