//! Trained artifacts: discovery, loading and the process-wide registry

pub mod locator;
pub mod metadata;
pub mod registry;
pub mod threshold;

pub use locator::{ArtifactKind, ArtifactLocator};
pub use metadata::ModelMetadata;
pub use registry::ArtifactRegistry;
pub use threshold::{ResolvedThreshold, ThresholdSource, DEFAULT_THRESHOLD};
