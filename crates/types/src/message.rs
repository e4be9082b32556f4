//! Messages flowing into and out of the pipeline

use crate::context::SensorContext;
use crate::field::FieldValue;
use crate::sensor::{SensorKey, SensorType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One tokenized wire message as delivered by the transport layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedMessage {
    /// Sentence formatter (`DPT`, `SDDPT`) or PGN (`PGN127508`, `127508`)
    pub message_type: String,
    #[serde(default)]
    pub fields: HashMap<String, FieldValue>,
    /// Receive time, epoch milliseconds
    pub timestamp: i64,
}

impl ParsedMessage {
    pub fn new(message_type: impl Into<String>, timestamp: i64) -> Self {
        Self {
            message_type: message_type.into(),
            fields: HashMap::new(),
            timestamp,
        }
    }

    /// Builder-style field insertion
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Partial sensor data decoded from one message
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorData {
    pub fields: BTreeMap<String, FieldValue>,
    /// Installation context reported on the wire (e.g. a tank's fluid type)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<SensorContext>,
}

impl SensorData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<FieldValue>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn with(mut self, key: &str, value: impl Into<FieldValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.context.is_none()
    }
}

/// Decoded data addressed to one sensor instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldUpdate {
    pub sensor_type: SensorType,
    pub instance: u8,
    pub data: SensorData,
}

impl FieldUpdate {
    pub fn new(sensor_type: SensorType, instance: u8, data: SensorData) -> Self {
        Self {
            sensor_type,
            instance,
            data,
        }
    }

    pub fn key(&self) -> SensorKey {
        SensorKey::new(self.sensor_type, self.instance)
    }
}

/// Change notification: which metrics of which sensor changed
///
/// Consumers re-read values through the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorUpdate {
    pub sensor_type: SensorType,
    pub instance: u8,
    pub changed_metric_keys: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsed_message_json() {
        let json = r#"{"messageType":"SDDPT","fields":{"depth":4.2,"status":"A"},"timestamp":1000}"#;
        let msg: ParsedMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.message_type, "SDDPT");
        assert_eq!(msg.fields["depth"], FieldValue::Number(4.2));
        assert_eq!(msg.fields["status"], FieldValue::Text("A".into()));
    }

    #[test]
    fn test_sensor_update_json() {
        let update = SensorUpdate {
            sensor_type: SensorType::Depth,
            instance: 0,
            changed_metric_keys: vec!["depth".into()],
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["sensorType"], "depth");
        assert_eq!(json["changedMetricKeys"][0], "depth");
    }
}
