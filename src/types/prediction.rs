//! Prediction output structures

use crate::types::row::FeatureRow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A scored row: the prepared features plus `fraud_proba` / `fraud_pred`
#[derive(Debug, Clone, Serialize)]
pub struct ScoredRow {
    /// Input row with the two derived columns appended
    pub row: FeatureRow,
    /// Probability of the fraud class (0.0 - 1.0)
    pub fraud_proba: f64,
    /// 1 when `fraud_proba >= threshold`
    pub fraud_pred: u8,
}

/// Human-readable outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Legitimate,
    Fraud,
}

impl Verdict {
    pub fn from_label(label: u8) -> Self {
        if label == 1 {
            Verdict::Fraud
        } else {
            Verdict::Legitimate
        }
    }
}

/// Result of scoring a single form submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Unique id for tracing this request in logs
    pub prediction_id: String,
    pub fraud_probability: f64,
    /// Binary label (0 = legitimate, 1 = fraud)
    pub prediction: u8,
    pub verdict: Verdict,
    /// Decision threshold the label was derived with
    pub threshold: f64,
    pub scored_at: DateTime<Utc>,
}

impl Prediction {
    pub fn new(fraud_probability: f64, prediction: u8, threshold: f64) -> Self {
        Self {
            prediction_id: uuid::Uuid::new_v4().to_string(),
            fraud_probability,
            prediction,
            verdict: Verdict::from_label(prediction),
            threshold,
            scored_at: Utc::now(),
        }
    }
}
