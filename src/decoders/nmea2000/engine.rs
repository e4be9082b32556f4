//! Engine parameters, rapid and dynamic

use super::{celsius, instance, SECONDS_TO_HOURS};
use crate::decoders::validation::Range;
use crate::decoders::{DecodeContext, DecodeResult};
use marine_sens_types::{FieldUpdate, SensorData, SensorType};

/// PGN 127488
pub fn decode_engine_rapid(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let instance = instance(&mut reader, ctx);
    let rpm = reader.number("speed", Range::RPM);
    let boost = reader.opt_number("boostPressure", Range::PRESSURE);

    let mut data = SensorData::new();
    if let Some(rpm) = rpm {
        data.set("rpm", rpm);
    }
    if let Some(boost) = boost {
        data.set("boostPressure", boost);
    }
    reader.finish(vec![FieldUpdate::new(SensorType::Engine, instance, data)])
}

/// PGN 127489
pub fn decode_engine_dynamic(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let instance = instance(&mut reader, ctx);

    let mut data = SensorData::new();
    if let Some(pressure) = reader.opt_number("oilPressure", Range::PRESSURE) {
        data.set("oilPressure", pressure);
    }
    if let Some(temperature) = celsius(&mut reader, "oilTemperature") {
        data.set("oilTemperature", temperature);
    }
    if let Some(temperature) = celsius(&mut reader, "temperature") {
        data.set("coolantTemp", temperature);
    }
    if let Some(voltage) = reader.opt_number("alternatorPotential", Range::VOLTAGE) {
        data.set("alternatorVoltage", voltage);
    }
    if let Some(rate) = reader.opt_number("fuelRate", Range::FLOW) {
        data.set("fuelRate", rate);
    }
    if let Some(hours) = reader.opt_scaled("totalEngineHours", SECONDS_TO_HOURS, Range::HOURS) {
        data.set("hours", hours);
    }
    reader.finish(vec![FieldUpdate::new(SensorType::Engine, instance, data)])
}
