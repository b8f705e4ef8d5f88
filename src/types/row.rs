//! Column-named feature rows
//!
//! A [`FeatureRow`] is one row of the feature table handed to a pipeline:
//! an ordered list of `(column, value)` pairs. Order is significant because
//! the pipeline manifest and the canonical column list are both positional.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt;

/// A single cell: either numeric or categorical text
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Number(f64),
    Text(String),
}

impl FeatureValue {
    /// Numeric view of the value. Text never coerces.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(n) => Some(*n),
            FeatureValue::Text(_) => None,
        }
    }

    /// String form used for categorical comparisons
    pub fn render(&self) -> Cow<'_, str> {
        match self {
            FeatureValue::Text(s) => Cow::Borrowed(s.as_str()),
            FeatureValue::Number(n) => Cow::Owned(n.to_string()),
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        FeatureValue::Number(value)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        FeatureValue::Text(value.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        FeatureValue::Text(value)
    }
}

impl TryFrom<Value> for FeatureValue {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Number(n) => n
                .as_f64()
                .map(FeatureValue::Number)
                .ok_or_else(|| format!("number {} is not representable as f64", n)),
            Value::String(s) => Ok(FeatureValue::Text(s)),
            Value::Bool(b) => Ok(FeatureValue::Number(if b { 1.0 } else { 0.0 })),
            Value::Null => Err("null values are not accepted".to_string()),
            Value::Array(_) | Value::Object(_) => {
                Err("nested values are not accepted".to_string())
            }
        }
    }
}

impl Serialize for FeatureValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FeatureValue::Number(n) => serializer.serialize_f64(*n),
            FeatureValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// Ordered, column-named record
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct FeatureRow {
    columns: Vec<(String, FeatureValue)>,
}

impl FeatureRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    pub fn get(&self, column: &str) -> Option<&FeatureValue> {
        self.position(column).map(|i| &self.columns[i].1)
    }

    /// Numeric value of a column, if present and numeric
    pub fn number(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(FeatureValue::as_f64)
    }

    /// Set a column. Existing columns keep their position.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<FeatureValue>) {
        let column = column.into();
        let value = value.into();
        match self.position(&column) {
            Some(i) => self.columns[i].1 = value,
            None => self.columns.push((column, value)),
        }
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, column: impl Into<String>, value: impl Into<FeatureValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn remove(&mut self, column: &str) -> Option<FeatureValue> {
        self.position(column).map(|i| self.columns.remove(i).1)
    }

    /// Reorder to exactly `columns`, or `None` if any is missing
    pub fn project(&self, columns: &[&str]) -> Option<FeatureRow> {
        let mut projected = Vec::with_capacity(columns.len());
        for column in columns {
            projected.push((column.to_string(), self.get(column)?.clone()));
        }
        Some(FeatureRow { columns: projected })
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|(name, _)| name == column)
    }
}

impl<K: Into<String>, V: Into<FeatureValue>> FromIterator<(K, V)> for FeatureRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = FeatureRow::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

impl TryFrom<Map<String, Value>> for FeatureRow {
    type Error = String;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut row = FeatureRow::new();
        for (column, value) in map {
            let value =
                FeatureValue::try_from(value).map_err(|e| format!("column {:?}: {}", column, e))?;
            row.insert(column, value);
        }
        Ok(row)
    }
}

impl Serialize for FeatureRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in &self.columns {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_position() {
        let mut row = FeatureRow::new().with("a", 1.0).with("b", "x");
        row.insert("a", 2.0);

        let names: Vec<&str> = row.column_names().collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(row.number("a"), Some(2.0));
    }

    #[test]
    fn test_project_requires_every_column() {
        let row = FeatureRow::new().with("a", 1.0).with("b", 2.0).with("c", 3.0);

        let projected = row.project(&["c", "a"]).unwrap();
        let names: Vec<&str> = projected.column_names().collect();
        assert_eq!(names, vec!["c", "a"]);

        assert!(row.project(&["a", "missing"]).is_none());
    }

    #[test]
    fn test_json_keeps_column_order() {
        let row: FeatureRow =
            serde_json::from_str(r#"{"z": 1, "a": "PayPal", "m": true}"#).unwrap();

        let names: Vec<&str> = row.column_names().collect();
        assert_eq!(names, vec!["z", "a", "m"]);
        assert_eq!(row.get("a"), Some(&FeatureValue::Text("PayPal".to_string())));
        assert_eq!(row.number("m"), Some(1.0));

        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"z":1.0,"a":"PayPal","m":1.0}"#);
    }

    #[test]
    fn test_null_is_rejected() {
        let result = serde_json::from_str::<FeatureRow>(r#"{"hour": null}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_render_numbers() {
        assert_eq!(FeatureValue::Number(2.0).render(), "2");
        assert_eq!(FeatureValue::Number(0.5).render(), "0.5");
    }
}
