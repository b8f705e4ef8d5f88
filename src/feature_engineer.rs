//! Engineered features the training pipeline expects.
//!
//! Raw form input lacks the columns that were derived during training
//! (night flag, high-risk payment flag, time bin, category fraud rate and
//! its complement). This module rebuilds them. A column that is already
//! present is never recomputed, so callers can override any derivation and
//! deriving twice gives the same row as deriving once.

use crate::artifacts::metadata::DEFAULT_CATEGORY_PROB;
use crate::types::columns;
use crate::types::FeatureRow;
use std::collections::BTreeMap;

/// Hours at or after this count as night
const NIGHT_START_HOUR: f64 = 21.0;
/// Hours before this count as night
const NIGHT_END_HOUR: f64 = 6.0;
const HIGH_RISK_PAYMENT_METHOD: &str = "paypal";

/// Category -> historical fraud probability, keyed case-insensitively
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryProbabilityMap {
    entries: BTreeMap<String, f64>,
    mean: f64,
}

impl CategoryProbabilityMap {
    /// Build from a non-empty mapping; `None` if empty
    pub fn new<I, K>(entries: I) -> Option<Self>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        let entries: BTreeMap<String, f64> = entries
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_lowercase(), v))
            .collect();
        if entries.is_empty() {
            return None;
        }
        let mean = entries.values().sum::<f64>() / entries.len() as f64;
        Some(Self { entries, mean })
    }

    /// Probability for a category; unseen categories get the mean of all entries
    pub fn probability(&self, category: &str) -> f64 {
        self.entries
            .get(&category.to_lowercase())
            .copied()
            .unwrap_or(self.mean)
    }
}

impl Default for CategoryProbabilityMap {
    fn default() -> Self {
        let entries = DEFAULT_CATEGORY_PROB
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect::<BTreeMap<_, _>>();
        let mean = entries.values().sum::<f64>() / entries.len() as f64;
        Self { entries, mean }
    }
}

/// Derives engineered features from raw transaction attributes
#[derive(Debug, Clone, Default)]
pub struct FeatureEngineer {
    category_probs: CategoryProbabilityMap,
}

impl FeatureEngineer {
    pub fn new(category_probs: CategoryProbabilityMap) -> Self {
        Self { category_probs }
    }

    pub fn category_probs(&self) -> &CategoryProbabilityMap {
        &self.category_probs
    }

    /// Fill in missing engineered columns.
    ///
    /// If the result holds every canonical column it is projected to the
    /// canonical order; otherwise whatever columns exist are passed through.
    pub fn derive(&self, raw: &FeatureRow) -> FeatureRow {
        let mut row = raw.clone();
        let hour = row.number(columns::HOUR);

        if !row.contains(columns::IS_NIGHT) {
            if let Some(hour) = hour {
                let night = hour >= NIGHT_START_HOUR || hour < NIGHT_END_HOUR;
                row.insert(columns::IS_NIGHT, flag(night));
            }
        }

        if !row.contains(columns::IS_HIGH_RISK_PAYMENT) {
            let method = row
                .get(columns::PAYMENT_METHOD)
                .map(|v| v.render().to_lowercase());
            if let Some(method) = method {
                row.insert(
                    columns::IS_HIGH_RISK_PAYMENT,
                    flag(method == HIGH_RISK_PAYMENT_METHOD),
                );
            }
        }

        if !row.contains(columns::TIME_BIN) {
            if let Some(hour) = hour {
                row.insert(columns::TIME_BIN, hour.trunc());
            }
        }

        if !row.contains(columns::CATEGORY_PROB) {
            let category = row.get(columns::CATEGORY).map(|v| v.render().into_owned());
            if let Some(category) = category {
                row.insert(
                    columns::CATEGORY_PROB,
                    self.category_probs.probability(&category),
                );
            }
        }

        if !row.contains(columns::CATEGORY_DEVIATION) {
            if let Some(p) = row.number(columns::CATEGORY_PROB) {
                row.insert(columns::CATEGORY_DEVIATION, 1.0 - p);
            }
        }

        row.project(&columns::CANONICAL_ORDER).unwrap_or(row)
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FeatureValue, TransactionRecord};

    fn row_with_hour(hour: f64) -> FeatureRow {
        FeatureRow::new().with(columns::HOUR, hour)
    }

    #[test]
    fn test_night_flag() {
        let engineer = FeatureEngineer::default();

        for (hour, expected) in [(22.0, 1.0), (10.0, 0.0), (5.0, 1.0), (21.0, 1.0), (6.0, 0.0)] {
            let row = engineer.derive(&row_with_hour(hour));
            assert_eq!(row.number(columns::IS_NIGHT), Some(expected), "hour {}", hour);
            assert_eq!(row.number(columns::TIME_BIN), Some(hour));
        }
    }

    #[test]
    fn test_high_risk_payment_is_case_insensitive() {
        let engineer = FeatureEngineer::default();

        let paypal = engineer.derive(&FeatureRow::new().with(columns::PAYMENT_METHOD, "PayPal"));
        assert_eq!(paypal.number(columns::IS_HIGH_RISK_PAYMENT), Some(1.0));

        let card = engineer.derive(&FeatureRow::new().with(columns::PAYMENT_METHOD, "CreditCard"));
        assert_eq!(card.number(columns::IS_HIGH_RISK_PAYMENT), Some(0.0));
    }

    #[test]
    fn test_unseen_category_uses_mean() {
        let engineer = FeatureEngineer::default();
        let row = engineer.derive(&FeatureRow::new().with(columns::CATEGORY, "luxury"));

        let expected = (0.344749 + 0.328588 + 0.329321) / 3.0;
        let p = row.number(columns::CATEGORY_PROB).unwrap();
        assert!((p - expected).abs() < 1e-12);
        assert!((p - 0.334223).abs() < 1e-5);

        let deviation = row.number(columns::CATEGORY_DEVIATION).unwrap();
        assert!((deviation - 0.665777).abs() < 1e-5);
    }

    #[test]
    fn test_category_lookup_ignores_case() {
        let engineer = FeatureEngineer::default();
        let row = engineer.derive(&FeatureRow::new().with(columns::CATEGORY, "Shopping"));

        assert_eq!(row.number(columns::CATEGORY_PROB), Some(0.344749));
    }

    #[test]
    fn test_custom_map() {
        let map = CategoryProbabilityMap::new([("Food", 0.9), ("toys", 0.1)]).unwrap();
        assert_eq!(map.probability("food"), 0.9);
        assert!((map.probability("books") - 0.5).abs() < 1e-12);

        assert!(CategoryProbabilityMap::new(Vec::<(String, f64)>::new()).is_none());
    }

    #[test]
    fn test_presupplied_values_win() {
        let engineer = FeatureEngineer::default();
        let raw = FeatureRow::new()
            .with(columns::HOUR, 23.0)
            .with(columns::IS_NIGHT, 0.0)
            .with(columns::CATEGORY, "food")
            .with(columns::CATEGORY_PROB, 0.7);

        let row = engineer.derive(&raw);
        assert_eq!(row.number(columns::IS_NIGHT), Some(0.0));
        assert_eq!(row.number(columns::CATEGORY_PROB), Some(0.7));
        assert!((row.number(columns::CATEGORY_DEVIATION).unwrap() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_derive_is_idempotent() {
        let engineer = FeatureEngineer::default();
        let raw = TransactionRecord::default().to_row().with("transaction_id", "tx_1");

        let once = engineer.derive(&raw);
        let twice = engineer.derive(&once);
        assert_eq!(once, twice);

        let partial = FeatureRow::new().with(columns::HOUR, 3.0).with("extra", "x");
        let once = engineer.derive(&partial);
        assert_eq!(engineer.derive(&once), once);
    }

    #[test]
    fn test_full_row_is_projected_to_canonical_order() {
        let engineer = FeatureEngineer::default();
        let raw = TransactionRecord::default().to_row().with("transaction_id", "tx_1");

        let row = engineer.derive(&raw);
        let names: Vec<&str> = row.column_names().collect();
        assert_eq!(names, columns::CANONICAL_ORDER.to_vec());
    }

    #[test]
    fn test_partial_row_passes_through() {
        let engineer = FeatureEngineer::default();
        let raw = FeatureRow::new()
            .with("transaction_id", "tx_1")
            .with(columns::HOUR, 12.0);

        let row = engineer.derive(&raw);
        let names: Vec<&str> = row.column_names().collect();
        assert_eq!(
            names,
            vec!["transaction_id", columns::HOUR, columns::IS_NIGHT, columns::TIME_BIN]
        );
        assert!(!row.contains(columns::CATEGORY_DEVIATION));
    }

    #[test]
    fn test_non_numeric_hour_is_skipped() {
        let engineer = FeatureEngineer::default();
        let row = engineer.derive(&FeatureRow::new().with(columns::HOUR, "late"));

        assert_eq!(row.get(columns::HOUR), Some(&FeatureValue::from("late")));
        assert!(!row.contains(columns::IS_NIGHT));
        assert!(!row.contains(columns::TIME_BIN));
    }
}
