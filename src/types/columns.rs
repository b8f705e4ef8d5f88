//! Column names used by the training pipeline

pub const PAYMENT_METHOD: &str = "paymentMethod";
pub const CATEGORY: &str = "Category";
pub const NUM_ITEMS: &str = "numItems";
pub const LOCAL_TIME: &str = "localTime";
pub const HOUR: &str = "hour";
pub const RISK_SCORE: &str = "risk_score";
pub const TRANSACTION_VELOCITY: &str = "transaction_velocity";
pub const PAYMENT_AGE_RATIO: &str = "payment_age_ratio";
pub const TEMPORAL_RISK_WINDOW: &str = "temporal_risk_window";

// Engineered
pub const IS_NIGHT: &str = "isNight";
pub const IS_HIGH_RISK_PAYMENT: &str = "isHighRiskPayment";
pub const TIME_BIN: &str = "time_bin";
pub const CATEGORY_PROB: &str = "category_prob";
pub const CATEGORY_DEVIATION: &str = "category_deviation";

/// Ground-truth column, never passed to the pipeline
pub const LABEL: &str = "label";

// Scorer output
pub const FRAUD_PROBA: &str = "fraud_proba";
pub const FRAUD_PRED: &str = "fraud_pred";

/// Column order the pipeline was trained on
pub const CANONICAL_ORDER: [&str; 14] = [
    NUM_ITEMS,
    LOCAL_TIME,
    PAYMENT_METHOD,
    CATEGORY,
    IS_HIGH_RISK_PAYMENT,
    HOUR,
    IS_NIGHT,
    RISK_SCORE,
    TIME_BIN,
    TRANSACTION_VELOCITY,
    PAYMENT_AGE_RATIO,
    CATEGORY_PROB,
    CATEGORY_DEVIATION,
    TEMPORAL_RISK_WINDOW,
];
