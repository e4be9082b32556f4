//! Sensor identity: the closed set of sensor types and the (type, instance) key

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of physical sensor a message describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SensorType {
    Depth,
    Speed,
    Wind,
    Gps,
    Compass,
    Engine,
    Battery,
    Tank,
    Temperature,
    Autopilot,
    Navigation,
    Weather,
    Rudder,
}

impl SensorType {
    /// Every sensor type, in declaration order
    pub const ALL: [SensorType; 13] = [
        SensorType::Depth,
        SensorType::Speed,
        SensorType::Wind,
        SensorType::Gps,
        SensorType::Compass,
        SensorType::Engine,
        SensorType::Battery,
        SensorType::Tank,
        SensorType::Temperature,
        SensorType::Autopilot,
        SensorType::Navigation,
        SensorType::Weather,
        SensorType::Rudder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorType::Depth => "depth",
            SensorType::Speed => "speed",
            SensorType::Wind => "wind",
            SensorType::Gps => "gps",
            SensorType::Compass => "compass",
            SensorType::Engine => "engine",
            SensorType::Battery => "battery",
            SensorType::Tank => "tank",
            SensorType::Temperature => "temperature",
            SensorType::Autopilot => "autopilot",
            SensorType::Navigation => "navigation",
            SensorType::Weather => "weather",
            SensorType::Rudder => "rudder",
        }
    }

    /// Human-readable name used when an instance has no configured name
    pub fn display_name(&self) -> &'static str {
        match self {
            SensorType::Depth => "Depth",
            SensorType::Speed => "Speed",
            SensorType::Wind => "Wind",
            SensorType::Gps => "GPS",
            SensorType::Compass => "Compass",
            SensorType::Engine => "Engine",
            SensorType::Battery => "Battery",
            SensorType::Tank => "Tank",
            SensorType::Temperature => "Temperature",
            SensorType::Autopilot => "Autopilot",
            SensorType::Navigation => "Navigation",
            SensorType::Weather => "Weather",
            SensorType::Rudder => "Rudder",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorType::ALL
            .iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("Unknown sensor type: {}", s))
    }
}

/// Identity of one physical sensor occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorKey {
    pub sensor_type: SensorType,
    pub instance: u8,
}

impl SensorKey {
    pub fn new(sensor_type: SensorType, instance: u8) -> Self {
        Self {
            sensor_type,
            instance,
        }
    }

    /// Key used by key-value stores, e.g. `battery.1`
    pub fn storage_key(&self) -> String {
        format!("{}.{}", self.sensor_type, self.instance)
    }

    /// Parse a storage key produced by [`SensorKey::storage_key`]
    pub fn from_storage_key(key: &str) -> Option<Self> {
        let (sensor_type, instance) = key.split_once('.')?;
        Some(Self {
            sensor_type: sensor_type.parse().ok()?,
            instance: instance.parse().ok()?,
        })
    }
}

impl fmt::Display for SensorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.sensor_type, self.instance)
    }
}
