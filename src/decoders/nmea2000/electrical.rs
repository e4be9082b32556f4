//! Battery status, DC detailed status and fluid level

use super::{celsius, instance, SECONDS_TO_HOURS};
use crate::decoders::validation::Range;
use crate::decoders::{DecodeContext, DecodeResult, ValidationError};
use marine_sens_types::{FieldUpdate, FluidType, SensorContext, SensorData, SensorType, TankContext};

/// PGN 127508
pub fn decode_battery_status(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let instance = instance(&mut reader, ctx);
    let voltage = reader.number("voltage", Range::VOLTAGE);
    let current = reader.opt_number("current", Range::CURRENT);
    let temperature = celsius(&mut reader, "temperature");

    let mut data = SensorData::new();
    if let Some(voltage) = voltage {
        data.set("voltage", voltage);
        if let Some(current) = current {
            data.set("power", voltage * current);
        }
    }
    if let Some(current) = current {
        data.set("current", current);
    }
    if let Some(temperature) = temperature {
        data.set("temperature", temperature);
    }
    reader.finish(vec![FieldUpdate::new(SensorType::Battery, instance, data)])
}

/// PGN 127506
pub fn decode_dc_detailed_status(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let instance = instance(&mut reader, ctx);
    let soc = reader.opt_number("stateOfCharge", Range::PERCENT);
    let remaining = reader.opt_scaled("timeRemaining", SECONDS_TO_HOURS, Range::HOURS);

    let mut data = SensorData::new();
    if let Some(soc) = soc {
        data.set("stateOfCharge", soc);
    }
    if let Some(remaining) = remaining {
        data.set("timeRemaining", remaining);
    }
    reader.finish(vec![FieldUpdate::new(SensorType::Battery, instance, data)])
}

/// PGN 127505
///
/// The fluid type travels as context; volume is derived when the tank
/// reports its capacity.
pub fn decode_fluid_level(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let instance = instance(&mut reader, ctx);
    let level = reader.number("level", Range::PERCENT);
    let capacity = reader.opt_number("capacity", Range::VOLUME);
    let fluid = match reader.opt_text("type") {
        Some(raw) => {
            let fluid = FluidType::from_wire(&raw);
            if fluid.is_none() {
                reader.reject(ValidationError::InvalidValue {
                    field: "type".to_string(),
                    value: raw,
                });
            }
            fluid
        }
        None => None,
    };

    let mut data = SensorData::new();
    if let Some(level) = level {
        data.set("level", level);
        if let Some(capacity) = capacity {
            data.set("volume", level * capacity / 100.0);
        }
    }
    if let Some(capacity) = capacity {
        data.set("capacity", capacity);
    }
    if let Some(fluid_type) = fluid {
        data.context = Some(SensorContext::Tank(TankContext {
            fluid_type,
            capacity_l: capacity,
        }));
    }
    reader.finish(vec![FieldUpdate::new(SensorType::Tank, instance, data)])
}
