//! Serialized sensor state and persisted sensor configuration

use crate::category::DataCategory;
use crate::context::SensorContext;
use crate::field::FieldValue;
use crate::sensor::SensorType;
use crate::threshold::Thresholds;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stored form of one metric: the canonical value and its category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetric {
    pub si_value: FieldValue,
    pub category: DataCategory,
    #[serde(default)]
    pub timestamp: i64,
}

/// Serialized form of a sensor instance
///
/// History is not part of a snapshot; it is rebuilt from live data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorSnapshot {
    pub sensor_type: SensorType,
    pub instance: u8,
    pub name: String,
    #[serde(default)]
    pub metrics: BTreeMap<String, SnapshotMetric>,
    #[serde(default)]
    pub thresholds: BTreeMap<String, Thresholds>,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<SensorContext>,
}

/// User-owned configuration persisted per (sensor type, instance)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<SensorContext>,
    #[serde(default)]
    pub metrics: BTreeMap<String, Thresholds>,
}
