//! Pipeline artifact loader

use crate::models::manifest::PipelineManifest;
use crate::models::ManifestPipeline;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Loader for pipeline manifests
#[derive(Debug, Default, Clone)]
pub struct PipelineLoader;

impl PipelineLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a pipeline manifest from file
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<ManifestPipeline> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading pipeline artifact");

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let manifest: PipelineManifest =
            serde_json::from_str(&text).context("Failed to parse pipeline manifest")?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "pipeline".to_string());
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        let pipeline = ManifestPipeline::from_manifest(&name, manifest, base_dir)?;

        info!(
            path = %path.display(),
            steps = pipeline.step_count(),
            "Pipeline loaded successfully"
        );

        Ok(pipeline)
    }
}
