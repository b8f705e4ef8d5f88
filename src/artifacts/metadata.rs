//! Model metadata written alongside the pipeline at training time

use crate::error::MetadataError;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Category -> fraud probability mapping measured during EDA
pub const DEFAULT_CATEGORY_PROB: [(&str, f64); 3] = [
    ("shopping", 0.344749),
    ("electronics", 0.328588),
    ("food", 0.329321),
];

/// Provenance record for a trained pipeline.
///
/// Every field is optional. Unrecognized or malformed fields are dropped
/// rather than failing the whole record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelMetadata {
    /// Training library versions, free-form
    pub versions: Map<String, Value>,
    /// Category mapping used to derive `category_prob`
    pub category_prob_map: Option<BTreeMap<String, f64>>,
    /// Raw `threshold` field; interpreted by the threshold resolvers
    pub threshold: Option<Value>,
}

impl ModelMetadata {
    /// Read and parse a metadata file
    pub fn read(path: &Path) -> Result<Self, MetadataError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse metadata JSON
    pub fn parse(text: &str) -> Result<Self, MetadataError> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(mut root) = value else {
            return Err(MetadataError::NotAnObject);
        };

        let versions = match root.remove("versions") {
            Some(Value::Object(versions)) => versions,
            _ => Map::new(),
        };

        let category_prob_map = root.remove("category_prob_map").and_then(parse_prob_map);

        Ok(Self {
            versions,
            category_prob_map,
            threshold: root.remove("threshold"),
        })
    }

    /// Versions rendered for error messages
    pub fn versions_hint(&self) -> String {
        if self.versions.is_empty() {
            "unknown".to_string()
        } else {
            Value::Object(self.versions.clone()).to_string()
        }
    }
}

/// Accept only a non-empty object of finite numbers
fn parse_prob_map(value: Value) -> Option<BTreeMap<String, f64>> {
    let Value::Object(entries) = value else {
        return None;
    };
    if entries.is_empty() {
        return None;
    }
    entries
        .into_iter()
        .map(|(category, p)| match p.as_f64() {
            Some(p) if p.is_finite() => Some((category, p)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_metadata() {
        let meta = ModelMetadata::parse(
            r#"{
                "versions": {"scikit-learn": "1.5.1", "xgboost": "2.1.0"},
                "category_prob_map": {"shopping": 0.4, "food": 0.2},
                "threshold": 0.25
            }"#,
        )
        .unwrap();

        assert_eq!(meta.versions.len(), 2);
        assert_eq!(meta.category_prob_map.unwrap().get("food"), Some(&0.2));
        assert_eq!(meta.threshold, Some(Value::from(0.25)));
    }

    #[test]
    fn test_malformed_fields_are_dropped() {
        let meta = ModelMetadata::parse(
            r#"{"versions": "n/a", "category_prob_map": {"shopping": "high"}}"#,
        )
        .unwrap();

        assert!(meta.versions.is_empty());
        assert!(meta.category_prob_map.is_none());
        assert!(meta.threshold.is_none());
        assert_eq!(meta.versions_hint(), "unknown");
    }

    #[test]
    fn test_rejects_non_object_root() {
        assert!(matches!(
            ModelMetadata::parse("[1, 2]"),
            Err(MetadataError::NotAnObject)
        ));
        assert!(matches!(
            ModelMetadata::parse("{not json"),
            Err(MetadataError::Json(_))
        ));
    }
}
