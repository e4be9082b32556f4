//! Sensor-type-specific context
//!
//! Context describes the physical installation rather than the live data:
//! battery chemistry, the fluid held by a tank, where a thermometer sits.
//! Each variant belongs to exactly one sensor type and is validated on every
//! assignment.

use crate::error::ConfigValidationError;
use crate::sensor::SensorType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BatteryChemistry {
    #[default]
    LeadAcid,
    Agm,
    Gel,
    LiFePo4,
    LithiumIon,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryContext {
    #[serde(default)]
    pub chemistry: BatteryChemistry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_ah: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nominal_voltage: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EngineType {
    #[default]
    Diesel,
    Gasoline,
    Outboard,
    Electric,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineContext {
    #[serde(default)]
    pub engine_type: EngineType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rpm: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FluidType {
    #[default]
    Fuel,
    FreshWater,
    WasteWater,
    LiveWell,
    Oil,
    BlackWater,
}

impl FluidType {
    /// Parse the fluid names used on the wire (`fuel`, `freshWater`, `Black water`...)
    pub fn from_wire(value: &str) -> Option<Self> {
        let normalized: String = value
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "fuel" | "diesel" | "0" => Some(FluidType::Fuel),
            "freshwater" | "water" | "1" => Some(FluidType::FreshWater),
            "wastewater" | "graywater" | "greywater" | "2" => Some(FluidType::WasteWater),
            "livewell" | "3" => Some(FluidType::LiveWell),
            "oil" | "4" => Some(FluidType::Oil),
            "blackwater" | "sewage" | "5" => Some(FluidType::BlackWater),
            _ => None,
        }
    }

    /// Tanks that alarm when filling up rather than draining
    pub fn alarms_when_full(&self) -> bool {
        matches!(self, FluidType::WasteWater | FluidType::BlackWater)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TankContext {
    #[serde(default)]
    pub fluid_type: FluidType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_l: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TemperatureLocation {
    #[default]
    Seawater,
    Outside,
    Inside,
    EngineRoom,
    Cabin,
    Refrigerator,
    Freezer,
    Exhaust,
    Other,
}

impl TemperatureLocation {
    /// Parse NMEA 2000 temperature source names and transducer labels
    pub fn from_wire(value: &str) -> Self {
        let normalized: String = value
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "sea" | "seatemperature" | "water" | "seawater" => TemperatureLocation::Seawater,
            "outside" | "outsidetemperature" | "air" => TemperatureLocation::Outside,
            "inside" | "insidetemperature" => TemperatureLocation::Inside,
            "engineroom" | "engineroomtemperature" => TemperatureLocation::EngineRoom,
            "cabin" | "maincabintemperature" => TemperatureLocation::Cabin,
            "refrigerator" | "refrigerationtemperature" | "fridge" => {
                TemperatureLocation::Refrigerator
            }
            "freezer" | "freezertemperature" => TemperatureLocation::Freezer,
            "exhaust" | "exhaustgastemperature" => TemperatureLocation::Exhaust,
            _ => TemperatureLocation::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureContext {
    #[serde(default)]
    pub location: TemperatureLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DepthReference {
    #[default]
    Transducer,
    Waterline,
    Keel,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthContext {
    #[serde(default)]
    pub reference_point: DepthReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_m: Option<f64>,
}

/// Installation details, tagged by the sensor type they belong to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SensorContext {
    Battery(BatteryContext),
    Engine(EngineContext),
    Tank(TankContext),
    Temperature(TemperatureContext),
    Depth(DepthContext),
}

fn check_positive(
    field: &str,
    value: Option<f64>,
    max: f64,
) -> Result<(), ConfigValidationError> {
    match value {
        Some(v) if !v.is_finite() => Err(ConfigValidationError::NonFinite {
            field: field.to_string(),
            value: v,
        }),
        Some(v) if v <= 0.0 || v > max => Err(ConfigValidationError::InvalidContext(format!(
            "{} must be in (0, {}], got {}",
            field, max, v
        ))),
        _ => Ok(()),
    }
}

impl SensorContext {
    /// The sensor type this context may be attached to
    pub fn sensor_type(&self) -> SensorType {
        match self {
            SensorContext::Battery(_) => SensorType::Battery,
            SensorContext::Engine(_) => SensorType::Engine,
            SensorContext::Tank(_) => SensorType::Tank,
            SensorContext::Temperature(_) => SensorType::Temperature,
            SensorContext::Depth(_) => SensorType::Depth,
        }
    }

    /// Default context for sensor types that carry one
    pub fn default_for(sensor_type: SensorType) -> Option<SensorContext> {
        match sensor_type {
            SensorType::Battery => Some(SensorContext::Battery(BatteryContext::default())),
            SensorType::Engine => Some(SensorContext::Engine(EngineContext::default())),
            SensorType::Tank => Some(SensorContext::Tank(TankContext::default())),
            SensorType::Temperature => {
                Some(SensorContext::Temperature(TemperatureContext::default()))
            }
            SensorType::Depth => Some(SensorContext::Depth(DepthContext::default())),
            _ => None,
        }
    }

    /// Check that this context fits `sensor_type` and its values are sane
    pub fn validate_for(&self, sensor_type: SensorType) -> Result<(), ConfigValidationError> {
        if self.sensor_type() != sensor_type {
            return Err(ConfigValidationError::ContextMismatch {
                expected: sensor_type,
                found: self.sensor_type(),
            });
        }
        match self {
            SensorContext::Battery(ctx) => {
                check_positive("capacityAh", ctx.capacity_ah, 100_000.0)?;
                check_positive("nominalVoltage", ctx.nominal_voltage, 1_000.0)
            }
            SensorContext::Engine(ctx) => check_positive("maxRpm", ctx.max_rpm, 20_000.0),
            SensorContext::Tank(ctx) => check_positive("capacityL", ctx.capacity_l, 100_000.0),
            SensorContext::Temperature(_) => Ok(()),
            SensorContext::Depth(ctx) => match ctx.offset_m {
                Some(v) if !v.is_finite() || v.abs() > 50.0 => {
                    Err(ConfigValidationError::InvalidContext(format!(
                        "depth offset must be within ±50 m, got {}",
                        v
                    )))
                }
                _ => Ok(()),
            },
        }
    }
}
