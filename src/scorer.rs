//! Threshold classification of prepared feature rows

use crate::error::ScoringError;
use crate::models::{Pipeline, FRAUD_CLASS};
use crate::types::columns;
use crate::types::{FeatureRow, ScoredRow};
use tracing::debug;

/// Scores rows with a pipeline and labels them against a fixed threshold
#[derive(Debug, Clone, Copy)]
pub struct Scorer {
    threshold: f64,
}

impl Scorer {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Label for a probability; the boundary counts as fraud
    pub fn classify(&self, probability: f64) -> u8 {
        u8::from(probability >= self.threshold)
    }

    /// Score a batch of rows.
    ///
    /// Any `label` column is dropped before scoring. Each output row is the
    /// input row with `fraud_proba` and `fraud_pred` appended.
    pub fn score(
        &self,
        rows: &[FeatureRow],
        pipeline: &dyn Pipeline,
    ) -> Result<Vec<ScoredRow>, ScoringError> {
        let rows: Vec<FeatureRow> = rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                row.remove(columns::LABEL);
                row
            })
            .collect();

        let proba = pipeline.predict_proba(&rows)?;
        if proba.len() != rows.len() {
            return Err(ScoringError::OutputShape {
                expected: rows.len(),
                got: proba.len(),
            });
        }

        let scored = rows
            .into_iter()
            .zip(proba)
            .map(|(mut row, distribution)| {
                let fraud_proba = distribution[FRAUD_CLASS];
                let fraud_pred = self.classify(fraud_proba);
                row.insert(columns::FRAUD_PROBA, fraud_proba);
                row.insert(columns::FRAUD_PRED, f64::from(fraud_pred));
                ScoredRow {
                    row,
                    fraud_proba,
                    fraud_pred,
                }
            })
            .collect::<Vec<_>>();

        debug!(
            rows = scored.len(),
            flagged = scored.iter().filter(|s| s.fraud_pred == 1).count(),
            threshold = self.threshold,
            "Rows scored"
        );

        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PreprocessingDescriptor;

    /// Returns `risk_score` as the fraud probability; rejects labelled rows
    struct RiskScorePipeline;

    impl Pipeline for RiskScorePipeline {
        fn predict_proba(&self, rows: &[FeatureRow]) -> Result<Vec<[f64; 2]>, ScoringError> {
            rows.iter()
                .map(|row| {
                    if row.contains(columns::LABEL) {
                        return Err(ScoringError::SchemaMismatch("label leaked".to_string()));
                    }
                    let p = row.number(columns::RISK_SCORE).ok_or_else(|| {
                        ScoringError::SchemaMismatch("risk_score missing".to_string())
                    })?;
                    Ok([1.0 - p, p])
                })
                .collect()
        }

        fn preprocessing(&self) -> Option<&dyn PreprocessingDescriptor> {
            None
        }

        fn describe(&self) -> String {
            "risk-score stub".to_string()
        }
    }

    /// Drops the last row
    struct ShortPipeline;

    impl Pipeline for ShortPipeline {
        fn predict_proba(&self, rows: &[FeatureRow]) -> Result<Vec<[f64; 2]>, ScoringError> {
            Ok(vec![[0.5, 0.5]; rows.len().saturating_sub(1)])
        }

        fn preprocessing(&self) -> Option<&dyn PreprocessingDescriptor> {
            None
        }

        fn describe(&self) -> String {
            "short".to_string()
        }
    }

    fn row(risk: f64) -> FeatureRow {
        FeatureRow::new().with("id", "tx").with(columns::RISK_SCORE, risk)
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let scorer = Scorer::new(0.25);

        let scored = scorer
            .score(&[row(0.25), row(0.2499), row(0.9)], &RiskScorePipeline)
            .unwrap();
        let labels: Vec<u8> = scored.iter().map(|s| s.fraud_pred).collect();
        assert_eq!(labels, vec![1, 0, 1]);
    }

    #[test]
    fn test_output_appends_columns() {
        let scorer = Scorer::new(0.1);
        let scored = scorer.score(&[row(0.3)], &RiskScorePipeline).unwrap();

        let names: Vec<&str> = scored[0].row.column_names().collect();
        assert_eq!(
            names,
            vec!["id", columns::RISK_SCORE, columns::FRAUD_PROBA, columns::FRAUD_PRED]
        );
        assert_eq!(scored[0].row.number(columns::FRAUD_PROBA), Some(0.3));
        assert_eq!(scored[0].row.number(columns::FRAUD_PRED), Some(1.0));
    }

    #[test]
    fn test_label_is_dropped() {
        let scorer = Scorer::new(0.5);
        let labelled = row(0.7).with(columns::LABEL, 1.0);

        let scored = scorer.score(&[labelled], &RiskScorePipeline).unwrap();
        assert!(!scored[0].row.contains(columns::LABEL));
        assert_eq!(scored[0].fraud_pred, 1);
    }

    #[test]
    fn test_schema_mismatch_propagates() {
        let scorer = Scorer::new(0.5);
        let result = scorer.score(&[FeatureRow::new().with("id", "tx")], &RiskScorePipeline);

        assert!(matches!(result, Err(ScoringError::SchemaMismatch(_))));
    }

    #[test]
    fn test_output_shape_checked() {
        let scorer = Scorer::new(0.5);
        let result = scorer.score(&[row(0.1), row(0.2)], &ShortPipeline);

        assert!(matches!(
            result,
            Err(ScoringError::OutputShape { expected: 2, got: 1 })
        ));
    }
}
