//! Transaction data structures for single-record prediction

use crate::error::ValidationError;
use crate::types::columns;
use crate::types::row::FeatureRow;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Payment method options offered by the form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PaymentMethod {
    CreditCard,
    StoreCredit,
    PayPal,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::CreditCard,
        PaymentMethod::StoreCredit,
        PaymentMethod::PayPal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "creditcard",
            PaymentMethod::StoreCredit => "storecredit",
            PaymentMethod::PayPal => "paypal",
        }
    }
}

/// Transaction category options offered by the form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Category {
    Shopping,
    Electronics,
    Food,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Shopping, Category::Electronics, Category::Food];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Shopping => "shopping",
            Category::Electronics => "electronics",
            Category::Food => "food",
        }
    }
}

macro_rules! option_conversions {
    ($ty:ident, $field:literal) => {
        impl FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_lowercase();
                $ty::ALL
                    .iter()
                    .copied()
                    .find(|option| option.as_str() == wanted)
                    .ok_or_else(|| {
                        let options: Vec<&str> = $ty::ALL.iter().map(|o| o.as_str()).collect();
                        ValidationError::new(
                            $field,
                            format!("{:?} is not one of {}", s, options.join("|")),
                        )
                    })
            }
        }

        impl TryFrom<String> for $ty {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.as_str().to_string()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

option_conversions!(PaymentMethod, "paymentMethod");
option_conversions!(Category, "Category");

/// One transaction as submitted through the prediction form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(rename = "paymentMethod", alias = "payment_method")]
    pub payment_method: PaymentMethod,

    #[serde(rename = "Category", alias = "category")]
    pub category: Category,

    /// Number of items (1-50)
    #[serde(rename = "numItems", alias = "num_items", deserialize_with = "whole_number")]
    pub num_items: u32,

    /// Normalized local time (roughly 4.70-5.05 in the training data)
    #[serde(rename = "localTime", alias = "local_time")]
    pub local_time: f64,

    /// Hour of day (0-23)
    #[serde(deserialize_with = "whole_number")]
    pub hour: u8,

    /// Composite risk indicator (0-1)
    pub risk_score: f64,

    /// Transaction intensity (>= 0)
    pub transaction_velocity: f64,

    /// Payment method age relative to account age (0-1)
    pub payment_age_ratio: f64,

    /// 1 when the transaction falls inside a known risk window
    #[serde(default, deserialize_with = "flag")]
    pub temporal_risk_window: u8,
}

impl TransactionRecord {
    /// Check the ranges the form enforces
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=50).contains(&self.num_items) {
            return Err(ValidationError::new(
                "numItems",
                format!("{} is outside 1-50", self.num_items),
            ));
        }
        if self.hour > 23 {
            return Err(ValidationError::new(
                "hour",
                format!("{} is outside 0-23", self.hour),
            ));
        }
        if !self.local_time.is_finite() {
            return Err(ValidationError::new("localTime", "must be a finite number"));
        }
        check_unit_interval("risk_score", self.risk_score)?;
        if !self.transaction_velocity.is_finite() || self.transaction_velocity < 0.0 {
            return Err(ValidationError::new(
                "transaction_velocity",
                format!("{} must be a finite number >= 0", self.transaction_velocity),
            ));
        }
        check_unit_interval("payment_age_ratio", self.payment_age_ratio)?;
        if self.temporal_risk_window > 1 {
            return Err(ValidationError::new(
                "temporal_risk_window",
                format!("{} is not 0 or 1", self.temporal_risk_window),
            ));
        }
        Ok(())
    }

    /// Raw feature row in form order; engineered columns are added later
    pub fn to_row(&self) -> FeatureRow {
        FeatureRow::new()
            .with(columns::PAYMENT_METHOD, self.payment_method.as_str())
            .with(columns::CATEGORY, self.category.as_str())
            .with(columns::NUM_ITEMS, f64::from(self.num_items))
            .with(columns::LOCAL_TIME, self.local_time)
            .with(columns::HOUR, f64::from(self.hour))
            .with(columns::RISK_SCORE, self.risk_score)
            .with(columns::TRANSACTION_VELOCITY, self.transaction_velocity)
            .with(columns::PAYMENT_AGE_RATIO, self.payment_age_ratio)
            .with(
                columns::TEMPORAL_RISK_WINDOW,
                f64::from(self.temporal_risk_window),
            )
    }
}

/// Integer field that also accepts integral floats such as `23.0`
fn whole_number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    let value = Value::deserialize(deserializer)?;
    let whole = match &value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(f))
                .map(|f| f as u64)
        }),
        _ => None,
    };
    let whole =
        whole.ok_or_else(|| D::Error::custom(format!("{} is not a whole number >= 0", value)))?;
    T::try_from(whole).map_err(|_| D::Error::custom(format!("{} is out of range", whole)))
}

/// 0/1 flag given as a number or a boolean
fn flag<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Bool(b) => Ok(u8::from(b)),
        other => whole_number(other).map_err(D::Error::custom),
    }
}

fn check_unit_interval(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::new(
            field,
            format!("{} is outside 0-1", value),
        ))
    }
}

impl Default for TransactionRecord {
    /// The form's initial values
    fn default() -> Self {
        Self {
            payment_method: PaymentMethod::CreditCard,
            category: Category::Shopping,
            num_items: 2,
            local_time: 4.92,
            hour: 14,
            risk_score: 0.15,
            transaction_velocity: 3.0,
            payment_age_ratio: 0.80,
            temporal_risk_window: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_training_names() {
        let json = r#"{
            "paymentMethod": "PayPal", "Category": "shopping", "numItems": 2,
            "localTime": 4.92, "hour": 23, "risk_score": 0.9,
            "transaction_velocity": 10, "payment_age_ratio": 0.01,
            "temporal_risk_window": 1
        }"#;
        let tx: TransactionRecord = serde_json::from_str(json).unwrap();

        assert_eq!(tx.payment_method, PaymentMethod::PayPal);
        assert_eq!(tx.category, Category::Shopping);
        assert_eq!(tx.hour, 23);
        assert!(tx.validate().is_ok());
    }

    #[test]
    fn test_unknown_option_is_rejected() {
        let json = r#"{
            "paymentMethod": "bitcoin", "Category": "shopping", "numItems": 2,
            "localTime": 4.92, "hour": 3, "risk_score": 0.1,
            "transaction_velocity": 1, "payment_age_ratio": 0.5
        }"#;
        assert!(serde_json::from_str::<TransactionRecord>(json).is_err());
    }

    #[test]
    fn test_validate_ranges() {
        let tx = TransactionRecord {
            num_items: 0,
            ..Default::default()
        };
        assert_eq!(tx.validate().unwrap_err().field, "numItems");

        let tx = TransactionRecord {
            hour: 24,
            ..Default::default()
        };
        assert_eq!(tx.validate().unwrap_err().field, "hour");

        let tx = TransactionRecord {
            risk_score: 1.5,
            ..Default::default()
        };
        assert_eq!(tx.validate().unwrap_err().field, "risk_score");

        let tx = TransactionRecord {
            transaction_velocity: -1.0,
            ..Default::default()
        };
        assert_eq!(tx.validate().unwrap_err().field, "transaction_velocity");

        let tx = TransactionRecord {
            temporal_risk_window: 2,
            ..Default::default()
        };
        assert_eq!(tx.validate().unwrap_err().field, "temporal_risk_window");

        assert!(TransactionRecord::default().validate().is_ok());
    }

    #[test]
    fn test_lenient_numbers_and_flags() {
        let json = r#"{
            "paymentMethod": "paypal", "Category": "food", "numItems": 3.0,
            "localTime": 4.9, "hour": 23.0, "risk_score": 0.2,
            "transaction_velocity": 1, "payment_age_ratio": 0.5,
            "temporal_risk_window": true
        }"#;
        let tx: TransactionRecord = serde_json::from_str(json).unwrap();

        assert_eq!(tx.num_items, 3);
        assert_eq!(tx.hour, 23);
        assert_eq!(tx.temporal_risk_window, 1);
    }

    #[test]
    fn test_malformed_numbers_are_rejected() {
        let base = serde_json::json!({
            "paymentMethod": "paypal", "Category": "food", "numItems": 2,
            "localTime": 4.9, "hour": 3, "risk_score": 0.2,
            "transaction_velocity": 1, "payment_age_ratio": 0.5
        });
        for (field, bad) in [
            ("hour", serde_json::json!(300)),
            ("hour", serde_json::json!(2.5)),
            ("numItems", serde_json::json!(-1)),
            ("temporal_risk_window", serde_json::json!("yes")),
        ] {
            let mut body = base.clone();
            body[field] = bad.clone();
            assert!(
                serde_json::from_value::<TransactionRecord>(body).is_err(),
                "{} = {}",
                field,
                bad
            );
        }
    }

    #[test]
    fn test_to_row_uses_training_columns() {
        let row = TransactionRecord::default().to_row();

        assert_eq!(row.len(), 9);
        assert_eq!(
            row.get(columns::PAYMENT_METHOD).map(|v| v.to_string()),
            Some("creditcard".to_string())
        );
        assert_eq!(row.number(columns::HOUR), Some(14.0));
    }
}
