//! Align categorical values with the encoder's training vocabulary.
//!
//! The encoder memorized exact spellings ("CreditCard" is not "creditcard").
//! Incoming values are first rewritten to the trained spelling by a
//! case-insensitive match; anything still outside the vocabulary is replaced
//! with a fallback category so the encoder never sees an unseen value.

use crate::models::{CategoricalColumn, PreprocessingDescriptor};
use crate::types::{FeatureRow, FeatureValue};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Catch-all category preferred by [`UnknownCategoryPolicy::OtherOrFirst`]
pub const OTHER_CATEGORY: &str = "other";

/// Which trained category replaces a value outside the vocabulary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCategoryPolicy {
    /// `other` if the vocabulary has it, else the first trained category
    #[default]
    OtherOrFirst,
    /// Always the first trained category
    First,
    /// A fixed label, used only if it is part of the vocabulary;
    /// otherwise behaves like `OtherOrFirst`
    Label(String),
}

impl UnknownCategoryPolicy {
    /// Pick the fallback for a vocabulary, `None` if the vocabulary is empty
    fn fallback<'a>(&self, categories: &'a [String]) -> Option<&'a str> {
        let find = |label: &str| categories.iter().find(|c| *c == label).map(String::as_str);
        let first = categories.first().map(String::as_str);
        match self {
            UnknownCategoryPolicy::First => first,
            UnknownCategoryPolicy::OtherOrFirst => find(OTHER_CATEGORY).or(first),
            UnknownCategoryPolicy::Label(label) => {
                find(label).or_else(|| find(OTHER_CATEGORY)).or(first)
            }
        }
    }
}

/// Per-column lookup built from one vocabulary
struct ColumnVocabulary<'a> {
    canonical: HashMap<String, &'a str>,
    known: HashSet<&'a str>,
    fallback: Option<&'a str>,
}

impl<'a> ColumnVocabulary<'a> {
    fn new(column: &'a CategoricalColumn, policy: &UnknownCategoryPolicy) -> Self {
        // Later spellings win when two categories differ only by case
        let canonical = column
            .categories
            .iter()
            .map(|c| (c.to_lowercase(), c.as_str()))
            .collect();
        let known = column.categories.iter().map(String::as_str).collect();
        Self {
            canonical,
            known,
            fallback: policy.fallback(&column.categories),
        }
    }

    fn align(&self, value: &str) -> Option<&'a str> {
        let rewritten = self
            .canonical
            .get(&value.to_lowercase())
            .copied()
            .unwrap_or(value);
        self.known.get(rewritten).copied().or(self.fallback)
    }
}

/// Rewrites categorical columns to match the trained vocabulary
#[derive(Debug, Clone, Default)]
pub struct CategoryAligner {
    policy: UnknownCategoryPolicy,
}

impl CategoryAligner {
    pub fn new(policy: UnknownCategoryPolicy) -> Self {
        Self { policy }
    }

    /// Align one row. Without a descriptor the row is returned unchanged.
    pub fn align(&self, row: &FeatureRow, descriptor: Option<&dyn PreprocessingDescriptor>) -> FeatureRow {
        let Some(descriptor) = descriptor else {
            return row.clone();
        };

        let mut aligned = row.clone();
        for column in descriptor.categorical_columns() {
            let Some(value) = row.get(&column.column) else {
                continue;
            };
            let vocabulary = ColumnVocabulary::new(column, &self.policy);
            let original = value.render();
            if let Some(trained) = vocabulary.align(&original) {
                if trained != original {
                    debug!(
                        column = %column.column,
                        from = %original,
                        to = %trained,
                        "Aligned categorical value"
                    );
                }
                aligned.insert(column.column.clone(), FeatureValue::from(trained));
            }
        }
        aligned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Vocab(Vec<CategoricalColumn>);

    impl PreprocessingDescriptor for Vocab {
        fn categorical_columns(&self) -> &[CategoricalColumn] {
            &self.0
        }
    }

    fn vocab(columns: &[(&str, &[&str])]) -> Vocab {
        Vocab(
            columns
                .iter()
                .map(|(column, categories)| CategoricalColumn {
                    column: column.to_string(),
                    categories: categories.iter().map(|c| c.to_string()).collect(),
                })
                .collect(),
        )
    }

    fn text(row: &FeatureRow, column: &str) -> String {
        row.get(column).map(|v| v.to_string()).unwrap_or_default()
    }

    #[test]
    fn test_casing_variants_map_to_trained_spelling() {
        let descriptor = vocab(&[("paymentMethod", &["CreditCard", "PayPal", "StoreCredit"])]);
        let aligner = CategoryAligner::default();

        for input in ["paypal", "PAYPAL", "PayPal", "pAyPaL"] {
            let row = FeatureRow::new().with("paymentMethod", input);
            let aligned = aligner.align(&row, Some(&descriptor));
            assert_eq!(text(&aligned, "paymentMethod"), "PayPal");
        }
    }

    #[test]
    fn test_unknown_prefers_other() {
        let descriptor = vocab(&[("Category", &["electronics", "food", "other"])]);
        let aligner = CategoryAligner::default();

        let row = FeatureRow::new().with("Category", "luxury");
        let aligned = aligner.align(&row, Some(&descriptor));
        assert_eq!(text(&aligned, "Category"), "other");
    }

    #[test]
    fn test_unknown_without_other_uses_first() {
        let descriptor = vocab(&[("Category", &["electronics", "food", "shopping"])]);
        let aligner = CategoryAligner::default();

        let row = FeatureRow::new().with("Category", "luxury");
        let aligned = aligner.align(&row, Some(&descriptor));
        assert_eq!(text(&aligned, "Category"), "electronics");
    }

    #[test]
    fn test_configurable_fallback() {
        let descriptor = vocab(&[("Category", &["electronics", "food", "other"])]);

        let first = CategoryAligner::new(UnknownCategoryPolicy::First);
        let row = FeatureRow::new().with("Category", "luxury");
        assert_eq!(text(&first.align(&row, Some(&descriptor)), "Category"), "electronics");

        let label = CategoryAligner::new(UnknownCategoryPolicy::Label("food".to_string()));
        assert_eq!(text(&label.align(&row, Some(&descriptor)), "Category"), "food");

        let missing_label = CategoryAligner::new(UnknownCategoryPolicy::Label("misc".to_string()));
        assert_eq!(
            text(&missing_label.align(&row, Some(&descriptor)), "Category"),
            "other"
        );
    }

    #[test]
    fn test_other_columns_untouched() {
        let descriptor = vocab(&[("Category", &["food"])]);
        let aligner = CategoryAligner::default();

        let row = FeatureRow::new()
            .with("hour", 23.0)
            .with("paymentMethod", "whatever")
            .with("Category", "FOOD");
        let aligned = aligner.align(&row, Some(&descriptor));

        assert_eq!(aligned.number("hour"), Some(23.0));
        assert_eq!(text(&aligned, "paymentMethod"), "whatever");
        assert_eq!(text(&aligned, "Category"), "food");
    }

    #[test]
    fn test_missing_column_and_no_descriptor() {
        let descriptor = vocab(&[("Category", &["food"])]);
        let aligner = CategoryAligner::default();

        let row = FeatureRow::new().with("hour", 1.0);
        assert_eq!(aligner.align(&row, Some(&descriptor)), row);

        let row = FeatureRow::new().with("Category", "LUXURY");
        assert_eq!(aligner.align(&row, None), row);
    }

    #[test]
    fn test_empty_vocabulary_leaves_value() {
        let descriptor = vocab(&[("Category", &[])]);
        let aligner = CategoryAligner::default();

        let row = FeatureRow::new().with("Category", "luxury");
        assert_eq!(aligner.align(&row, Some(&descriptor)), row);
    }

    #[test]
    fn test_numeric_values_compare_as_text() {
        let descriptor = vocab(&[("temporal_risk_window", &["0", "1"])]);
        let aligner = CategoryAligner::default();

        let row = FeatureRow::new().with("temporal_risk_window", 1.0);
        let aligned = aligner.align(&row, Some(&descriptor));
        assert_eq!(aligned.get("temporal_risk_window"), Some(&FeatureValue::from("1")));
    }

    #[test]
    fn test_policy_from_config_value() {
        let policy: UnknownCategoryPolicy = serde_json::from_str(r#""other_or_first""#).unwrap();
        assert_eq!(policy, UnknownCategoryPolicy::OtherOrFirst);

        let policy: UnknownCategoryPolicy = serde_json::from_str(r#"{"label": "misc"}"#).unwrap();
        assert_eq!(policy, UnknownCategoryPolicy::Label("misc".to_string()));
    }
}
