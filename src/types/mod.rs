//! Type definitions for the fraud scoring service

pub mod columns;
pub mod prediction;
pub mod row;
pub mod transaction;

pub use prediction::{Prediction, ScoredRow, Verdict};
pub use row::{FeatureRow, FeatureValue};
pub use transaction::{Category, PaymentMethod, TransactionRecord};
