//! Alarm thresholds
//!
//! Thresholds are directional: a `below` configuration alarms when a value
//! falls to its minimum limits, an `above` configuration when it rises to its
//! maximum limits. A configuration is checked with [`Thresholds::validate`]
//! before it is stored anywhere.

use crate::error::ConfigValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Optional lower and upper bound for one alarm level
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Limits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl Limits {
    pub fn min(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn max(max: f64) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }
}

/// Which way a value has to move to raise an alarm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdDirection {
    Above,
    Below,
}

impl fmt::Display for ThresholdDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdDirection::Above => f.write_str("above"),
            ThresholdDirection::Below => f.write_str("below"),
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Critical and warning limits for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default)]
    pub critical: Limits,
    #[serde(default)]
    pub warning: Limits,
    pub direction: ThresholdDirection,
    /// Disabled thresholds are kept but never raise an alarm
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Thresholds {
    /// Alarm when the value drops to `critical` or `warning`
    pub fn below(critical: f64, warning: f64) -> Self {
        Self {
            critical: Limits::min(critical),
            warning: Limits::min(warning),
            direction: ThresholdDirection::Below,
            enabled: true,
        }
    }

    /// Alarm when the value rises to `warning` or `critical`
    pub fn above(critical: f64, warning: f64) -> Self {
        Self {
            critical: Limits::max(critical),
            warning: Limits::max(warning),
            direction: ThresholdDirection::Above,
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Check finiteness, direction and ordering
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let checks = [
            ("critical.min", self.critical.min),
            ("critical.max", self.critical.max),
            ("warning.min", self.warning.min),
            ("warning.max", self.warning.max),
        ];
        for (field, value) in checks {
            if let Some(value) = value {
                if !value.is_finite() {
                    return Err(ConfigValidationError::NonFinite {
                        field: field.to_string(),
                        value,
                    });
                }
            }
        }

        for (level, limits) in [("critical", &self.critical), ("warning", &self.warning)] {
            if let (Some(min), Some(max)) = (limits.min, limits.max) {
                if min >= max {
                    return Err(ConfigValidationError::InvertedRange { level, min, max });
                }
            }
        }

        match self.direction {
            ThresholdDirection::Below => match (self.critical.min, self.warning.min) {
                (None, None) => Err(ConfigValidationError::MissingLimit {
                    direction: "below",
                    limit: "min",
                }),
                (Some(critical), Some(warning)) if critical >= warning => {
                    Err(ConfigValidationError::BelowOrdering { critical, warning })
                }
                _ => Ok(()),
            },
            ThresholdDirection::Above => match (self.critical.max, self.warning.max) {
                (None, None) => Err(ConfigValidationError::MissingLimit {
                    direction: "above",
                    limit: "max",
                }),
                (Some(critical), Some(warning)) if critical <= warning => {
                    Err(ConfigValidationError::AboveOrdering { critical, warning })
                }
                _ => Ok(()),
            },
        }
    }
}
