//! Error types shared across crates

use crate::sensor::SensorType;
use thiserror::Error;

/// A threshold or context configuration that may not be stored
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigValidationError {
    #[error("{field} must be a finite number, got {value}")]
    NonFinite { field: String, value: f64 },

    #[error("'{direction}' thresholds need at least one {limit} limit")]
    MissingLimit {
        direction: &'static str,
        limit: &'static str,
    },

    #[error("'below' thresholds need critical.min ({critical}) < warning.min ({warning})")]
    BelowOrdering { critical: f64, warning: f64 },

    #[error("'above' thresholds need critical.max ({critical}) > warning.max ({warning})")]
    AboveOrdering { critical: f64, warning: f64 },

    #[error("{level} range is inverted: min {min} >= max {max}")]
    InvertedRange {
        level: &'static str,
        min: f64,
        max: f64,
    },

    #[error("{sensor_type} has no alarmable metric '{key}'")]
    NotAlarmable { sensor_type: SensorType, key: String },

    #[error("context for {found} cannot be assigned to a {expected} sensor")]
    ContextMismatch {
        expected: SensorType,
        found: SensorType,
    },

    #[error("invalid context: {0}")]
    InvalidContext(String),
}

/// A snapshot or persisted record that cannot be turned back into live state
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("malformed record for {key}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("record for {key} is inconsistent: {reason}")]
    Inconsistent { key: String, reason: String },
}
