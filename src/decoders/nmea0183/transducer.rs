//! XDR transducer measurements
//!
//! An XDR sentence carries numbered groups `typeN`, `valueN`, `unitN`,
//! `nameN`. The transducer name decides which sensor a group belongs to;
//! names like `ENGINE#1` or `BATTERY2` carry the instance. Groups with
//! names or types not listed here are skipped.

use crate::decoders::validation::{FieldReader, Range};
use crate::decoders::{DecodeContext, DecodeResult, ValidationError};
use marine_sens_core::constants::{BAR_TO_PA, KELVIN_OFFSET};
use marine_sens_types::{FieldUpdate, FluidType, SensorContext, SensorData, SensorType, TankContext};
use log::trace;
use std::collections::BTreeMap;

/// Split `ENGINE#1` / `BATTERY2` into name and instance
fn split_name(name: &str) -> (String, Option<u8>) {
    let upper = name.trim().to_ascii_uppercase();
    if let Some((base, index)) = upper.split_once('#') {
        return (base.to_string(), index.parse().ok());
    }
    let digits = upper.len() - upper.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 && digits < upper.len() {
        let (base, index) = upper.split_at(upper.len() - digits);
        return (base.to_string(), index.parse().ok());
    }
    (upper, None)
}

/// Where one group goes: sensor, metric key, valid range
struct Target {
    sensor_type: SensorType,
    key: &'static str,
    range: Range,
    fluid: Option<FluidType>,
}

impl Target {
    const fn new(sensor_type: SensorType, key: &'static str, range: Range) -> Self {
        Self {
            sensor_type,
            key,
            range,
            fluid: None,
        }
    }

    const fn tank(fluid: FluidType) -> Self {
        Self {
            sensor_type: SensorType::Tank,
            key: "level",
            range: Range::PERCENT,
            fluid: Some(fluid),
        }
    }
}

fn target(name: &str, kind: &str) -> Option<Target> {
    use SensorType::*;
    let target = match (name, kind) {
        ("ENGINE", "C") => Target::new(Engine, "coolantTemp", Range::TEMPERATURE),
        ("ENGINE", "P") | ("ENGINEOIL", "P") => Target::new(Engine, "oilPressure", Range::PRESSURE),
        ("ENGINEOIL", "C") => Target::new(Engine, "oilTemperature", Range::TEMPERATURE),
        ("ENGINE", "U") | ("ALTERNATOR", "U") => {
            Target::new(Engine, "alternatorVoltage", Range::VOLTAGE)
        }
        ("ENGINE", "T") => Target::new(Engine, "rpm", Range::RPM),
        ("BATTERY", "U") | ("BATT", "U") => Target::new(Battery, "voltage", Range::VOLTAGE),
        ("BATTERY", "I") | ("BATT", "I") => Target::new(Battery, "current", Range::CURRENT),
        ("BATTERY", "C") | ("BATT", "C") => Target::new(Battery, "temperature", Range::TEMPERATURE),
        ("FUEL", "V") => Target::tank(FluidType::Fuel),
        ("FRESHWATER", "V") | ("WATER", "V") => Target::tank(FluidType::FreshWater),
        ("WASTEWATER", "V") | ("GREYWATER", "V") => Target::tank(FluidType::WasteWater),
        ("BLACKWATER", "V") => Target::tank(FluidType::BlackWater),
        ("BARO", "P") | ("BAROMETER", "P") => {
            Target::new(Weather, "barometricPressure", Range::ATMOSPHERIC)
        }
        ("AIR", "C") | ("TEMPAIR", "C") => Target::new(Weather, "airTemperature", Range::TEMPERATURE),
        ("AIR", "H") | ("HUMIDITY", "H") => Target::new(Weather, "humidity", Range::PERCENT),
        ("WATER", "C") | ("TEMPWATER", "C") => {
            Target::new(Weather, "waterTemperature", Range::TEMPERATURE)
        }
        ("PITCH", "A") => Target::new(Compass, "pitch", Range::SIGNED_ANGLE),
        ("ROLL", "A") => Target::new(Compass, "roll", Range::SIGNED_ANGLE),
        ("RUDDER", "A") => Target::new(Rudder, "rudderAngle", Range::RUDDER),
        _ => return None,
    };
    Some(target)
}

/// Scale factor into canonical units for a type/unit pair
fn convert(kind: &str, unit: &str, value: f64) -> Option<f64> {
    match (kind, unit) {
        ("C", "C") | ("C", "") => Some(value),
        ("C", "K") => Some(value - KELVIN_OFFSET),
        ("P", "B") => Some(value * BAR_TO_PA),
        ("P", "P") => Some(value),
        ("U", "V") | ("U", "") => Some(value),
        ("I", "A") | ("I", "") => Some(value),
        ("A", "D") | ("A", "") => Some(value),
        ("V", "P") => Some(value),
        ("T", "R") | ("T", "") => Some(value),
        ("H", "P") | ("H", "") => Some(value),
        _ => None,
    }
}

fn group_value(reader: &mut FieldReader<'_>, index: usize, kind: &str, target: &Target) -> Option<f64> {
    let value_key = format!("value{}", index);
    let unit = reader
        .opt_text(&format!("unit{}", index))
        .unwrap_or_default()
        .to_ascii_uppercase();
    let raw = reader.number(&value_key, Range::ANY)?;
    let Some(value) = convert(kind, &unit, raw) else {
        reader.reject(ValidationError::InvalidValue {
            field: format!("unit{}", index),
            value: unit,
        });
        return None;
    };
    if target.range.contains(value) {
        Some(value)
    } else {
        reader.reject(ValidationError::OutOfRange {
            field: value_key,
            value,
            min: target.range.min,
            max: target.range.max,
        });
        None
    }
}

pub fn decode_xdr(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let mut grouped: BTreeMap<(SensorType, u8), SensorData> = BTreeMap::new();

    let mut index = 1;
    while reader.has(&format!("type{}", index)) {
        let kind = reader
            .opt_text(&format!("type{}", index))
            .unwrap_or_default()
            .to_ascii_uppercase();
        let (name, instance) = split_name(&reader.opt_text(&format!("name{}", index)).unwrap_or_default());

        match target(&name, &kind) {
            Some(target) => {
                if let Some(value) = group_value(&mut reader, index, &kind, &target) {
                    let instance = instance.unwrap_or(ctx.instance);
                    let data = grouped.entry((target.sensor_type, instance)).or_default();
                    data.set(target.key, value);
                    if let Some(fluid) = target.fluid {
                        data.context = Some(SensorContext::Tank(TankContext {
                            fluid_type: fluid,
                            capacity_l: None,
                        }));
                    }
                }
            }
            None => trace!("XDR group {} ({} {}) has no mapping, skipped", index, kind, name),
        }
        index += 1;
    }

    let updates: Vec<FieldUpdate> = grouped
        .into_iter()
        .map(|((sensor_type, instance), data)| FieldUpdate::new(sensor_type, instance, data))
        .collect();
    reader.finish(updates)
}
