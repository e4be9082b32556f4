//! Field values and field metadata for sensor schemas

use crate::category::DataCategory;
use crate::threshold::Thresholds;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A decoded field: a number or a piece of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Number(_) => None,
            FieldValue::Text(s) => Some(s),
        }
    }

    /// Numbers must be finite to be stored anywhere
    pub fn is_finite(&self) -> bool {
        match self {
            FieldValue::Number(n) => n.is_finite(),
            FieldValue::Text(_) => true,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// Metadata describing a single sensor field
#[derive(Debug, Clone, Serialize)]
pub struct FieldMetadata {
    /// Key under which the metric is stored, e.g. `coolantTemp`
    pub key: &'static str,
    /// Human-readable name
    pub label: &'static str,
    /// Short instrument-panel abbreviation, e.g. `ECT`
    pub mnemonic: &'static str,
    pub category: DataCategory,
    /// Thresholds applied when no persisted configuration exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_thresholds: Option<Thresholds>,
    /// Whether users may configure alarms on this field
    pub alarmable: bool,
}

impl FieldMetadata {
    pub const fn new(
        key: &'static str,
        label: &'static str,
        mnemonic: &'static str,
        category: DataCategory,
    ) -> Self {
        Self {
            key,
            label,
            mnemonic,
            category,
            default_thresholds: None,
            alarmable: false,
        }
    }

    /// Mark the field as alarmable without enabling any default alarm
    pub fn alarmable(mut self) -> Self {
        self.alarmable = true;
        self
    }

    /// Mark the field as alarmable with default thresholds
    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.alarmable = true;
        self.default_thresholds = Some(thresholds);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_untagged() {
        let n: FieldValue = serde_json::from_str("12.5").unwrap();
        assert_eq!(n, FieldValue::Number(12.5));
        let s: FieldValue = serde_json::from_str("\"A\"").unwrap();
        assert_eq!(s.as_str(), Some("A"));
        assert!(!FieldValue::Number(f64::NAN).is_finite());
    }
}
