//! Alarm levels and alarm events

use crate::sensor::SensorType;
use serde::{Deserialize, Serialize};

/// Ordinal alarm severity, serialized as its number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum AlarmLevel {
    #[default]
    Normal = 0,
    /// No recent data
    Stale = 1,
    Warning = 2,
    Critical = 3,
}

impl AlarmLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmLevel::Normal => "normal",
            AlarmLevel::Stale => "stale",
            AlarmLevel::Warning => "warning",
            AlarmLevel::Critical => "critical",
        }
    }

    /// Warning or critical
    pub fn is_alarm(&self) -> bool {
        *self >= AlarmLevel::Warning
    }
}

impl From<AlarmLevel> for u8 {
    fn from(level: AlarmLevel) -> u8 {
        level as u8
    }
}

impl TryFrom<u8> for AlarmLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AlarmLevel::Normal),
            1 => Ok(AlarmLevel::Stale),
            2 => Ok(AlarmLevel::Warning),
            3 => Ok(AlarmLevel::Critical),
            other => Err(format!("alarm level out of range: {}", other)),
        }
    }
}

/// Emitted whenever a metric's alarm level changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmEvent {
    pub sensor_type: SensorType,
    pub instance: u8,
    pub metric_key: String,
    pub level: AlarmLevel,
    pub timestamp: i64,
}
