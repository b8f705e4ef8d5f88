//! Configuration management for the scoring service

use crate::artifacts::DEFAULT_THRESHOLD;
use crate::category_aligner::UnknownCategoryPolicy;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Prefix for environment overrides, e.g. `FRAUD_SCORING__SERVER__BIND`
const ENV_PREFIX: &str = "FRAUD_SCORING";

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub artifacts: ArtifactsConfig,
    pub aligner: AlignerConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Where the trained artifacts live
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Directory every candidate path is resolved against
    pub base_dir: String,
    /// Pipeline manifest candidates, highest priority first
    pub pipeline_candidates: Vec<String>,
    pub metadata_candidates: Vec<String>,
    pub threshold_candidates: Vec<String>,
    /// Used when neither metadata nor the threshold artifact has a usable value
    pub default_threshold: f64,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            base_dir: ".".to_string(),
            pipeline_candidates: strings(&[
                "deployment/model.json",
                "artifacts/model_pipeline.json",
                "xgboost_best_model.json",
            ]),
            metadata_candidates: strings(&[
                "deployment/model_meta.json",
                "artifacts/model_meta.json",
                "model_meta.json",
            ]),
            threshold_candidates: strings(&[
                "deployment/best_threshold.json",
                "artifacts/best_threshold.json",
                "best_threshold.json",
            ]),
            default_threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Category alignment configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AlignerConfig {
    /// Replacement for values outside the trained vocabulary
    pub unknown_category: UnknownCategoryPolicy,
}

/// Metrics reporting configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Seconds between summary logs; 0 disables periodic reports
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 60,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file plus environment overrides
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path.
    ///
    /// A missing file is not an error: every field has a default.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_env(path, environment())
    }

    /// Load from `path`, then apply overrides from `env`
    fn load_with_env<P: AsRef<Path>>(path: P, env: Environment) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(env)
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
