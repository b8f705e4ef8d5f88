//! Artifact discovery over ordered candidate paths

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::ArtifactsConfig;

/// The three artifacts a deployment ships
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Pipeline,
    Metadata,
    Threshold,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::Pipeline => "pipeline",
            ArtifactKind::Metadata => "metadata",
            ArtifactKind::Threshold => "threshold",
        };
        f.write_str(name)
    }
}

/// Resolves each artifact kind to the first candidate that exists.
///
/// Earlier candidates win, so a project-local artifact shadows a bundled
/// fallback. Lookups only check existence and have no side effects.
#[derive(Debug, Clone)]
pub struct ArtifactLocator {
    base_dir: PathBuf,
    pipeline: Vec<PathBuf>,
    metadata: Vec<PathBuf>,
    threshold: Vec<PathBuf>,
}

impl ArtifactLocator {
    pub fn new(
        base_dir: impl Into<PathBuf>,
        pipeline: Vec<PathBuf>,
        metadata: Vec<PathBuf>,
        threshold: Vec<PathBuf>,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            pipeline,
            metadata,
            threshold,
        }
    }

    pub fn from_config(config: &ArtifactsConfig) -> Self {
        Self::new(
            &config.base_dir,
            config.pipeline_candidates.iter().map(PathBuf::from).collect(),
            config.metadata_candidates.iter().map(PathBuf::from).collect(),
            config.threshold_candidates.iter().map(PathBuf::from).collect(),
        )
    }

    /// Candidate paths for a kind, joined onto the base directory, in priority order
    pub fn candidates(&self, kind: ArtifactKind) -> Vec<PathBuf> {
        let relative = match kind {
            ArtifactKind::Pipeline => &self.pipeline,
            ArtifactKind::Metadata => &self.metadata,
            ArtifactKind::Threshold => &self.threshold,
        };
        relative.iter().map(|p| self.base_dir.join(p)).collect()
    }

    /// First existing candidate, or `None` when none exists
    pub fn locate(&self, kind: ArtifactKind) -> Option<PathBuf> {
        find_first(&self.candidates(kind))
    }

    /// Human-readable list of the searched paths, for error messages
    pub fn describe(&self, kind: ArtifactKind) -> String {
        self.candidates(kind)
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// First path in `candidates` that exists on disk
pub fn find_first<P: AsRef<Path>>(candidates: &[P]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(AsRef::as_ref)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
}
