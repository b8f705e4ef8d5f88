//! Payment Fraud Scoring Library
//!
//! Loads a trained fraud-classification pipeline and its companion
//! artifacts once, then scores transactions: engineered features are
//! rebuilt, categorical values are aligned with the encoder's vocabulary,
//! and the fraud probability is turned into a 0/1 label with a decision
//! threshold.

pub mod artifacts;
pub mod category_aligner;
pub mod config;
pub mod error;
pub mod feature_engineer;
pub mod inference;
pub mod metrics;
pub mod models;
pub mod scorer;
pub mod server;
pub mod types;

pub use artifacts::{ArtifactLocator, ArtifactRegistry};
pub use category_aligner::{CategoryAligner, UnknownCategoryPolicy};
pub use config::AppConfig;
pub use feature_engineer::{CategoryProbabilityMap, FeatureEngineer};
pub use inference::InferenceEngine;
pub use scorer::Scorer;
pub use types::{FeatureRow, FeatureValue, Prediction, ScoredRow, TransactionRecord};
