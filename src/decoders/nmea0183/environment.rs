//! MTW, MDA, MMB, MTA

use crate::decoders::validation::Range;
use crate::decoders::{DecodeContext, DecodeResult, ValidationError};
use marine_sens_core::constants::{BAR_TO_PA, INHG_TO_PA, KNOTS_TO_MPS};
use marine_sens_types::{
    SensorContext, SensorData, SensorType, TemperatureContext, TemperatureLocation,
};

const PRESSURE_FIELDS: [(&str, f64); 2] = [("pressureBars", BAR_TO_PA), ("pressureInches", INHG_TO_PA)];

/// Water temperature
pub fn decode_mtw(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let mut data = SensorData::new();
    if let Some(temperature) = reader.number("temperature", Range::TEMPERATURE) {
        data.set("value", temperature);
        data.set("source", ctx.kind);
    }
    data.context = Some(SensorContext::Temperature(TemperatureContext {
        location: TemperatureLocation::Seawater,
    }));
    reader.finish(vec![ctx.update(SensorType::Temperature, data)])
}

/// Meteorological composite
pub fn decode_mda(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let fields = [
        ("airTemperature", "airTemperature", Range::TEMPERATURE),
        ("waterTemperature", "waterTemperature", Range::TEMPERATURE),
        ("relativeHumidity", "humidity", Range::PERCENT),
        ("dewPoint", "dewPoint", Range::TEMPERATURE),
        ("windDirectionTrue", "windDirection", Range::BEARING),
    ];

    let mut data = SensorData::new();
    if let Some(pressure) = reader.opt_first_of(&PRESSURE_FIELDS, Range::ATMOSPHERIC) {
        data.set("barometricPressure", pressure);
    }
    for (wire, key, range) in fields {
        if let Some(value) = reader.opt_number(wire, range) {
            data.set(key, value);
        }
    }
    if let Some(speed) = reader.opt_first_of(
        &[("windSpeedMps", 1.0), ("windSpeedKnots", KNOTS_TO_MPS)],
        Range::WIND_SPEED,
    ) {
        data.set("windSpeed", speed);
    }
    if data.is_empty() && reader.is_ok() {
        reader.reject(ValidationError::Missing("pressureBars".into()));
    }
    reader.finish(vec![ctx.update(SensorType::Weather, data)])
}

/// Barometer
pub fn decode_mmb(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let mut data = SensorData::new();
    if let Some(pressure) = reader.first_of(&PRESSURE_FIELDS, Range::ATMOSPHERIC) {
        data.set("barometricPressure", pressure);
    }
    reader.finish(vec![ctx.update(SensorType::Weather, data)])
}

/// Air temperature
pub fn decode_mta(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let mut data = SensorData::new();
    if let Some(temperature) = reader.number("temperature", Range::TEMPERATURE) {
        data.set("airTemperature", temperature);
    }
    reader.finish(vec![ctx.update(SensorType::Weather, data)])
}

#[cfg(test)]
mod tests {
    use crate::decoders::MessageProcessor;
    use marine_sens_types::{FieldValue, ParsedMessage, SensorContext, SensorType};

    #[test]
    fn test_mtw_reports_seawater_temperature() {
        let mut processor = MessageProcessor::default();
        let result = processor.process(&ParsedMessage::new("YXMTW", 0).with("temperature", 17.5));
        let update = &result.updates[0];
        assert_eq!(update.sensor_type, SensorType::Temperature);
        assert_eq!(update.data.fields["value"], FieldValue::Number(17.5));
        assert!(matches!(update.data.context, Some(SensorContext::Temperature(_))));
    }

    #[test]
    fn test_mda_composite() {
        let mut processor = MessageProcessor::default();
        let msg = ParsedMessage::new("WIMDA", 0)
            .with("pressureInches", 30.0)
            .with("pressureBars", 1.0159)
            .with("airTemperature", 21.3)
            .with("relativeHumidity", 65.0)
            .with("windDirectionTrue", 270.0)
            .with("windSpeedKnots", 10.0);
        let result = processor.process(&msg);
        let data = &result.updates[0].data;
        assert!((data.fields["barometricPressure"].as_f64().unwrap() - 101_590.0).abs() < 1e-6);
        assert_eq!(data.fields["humidity"], FieldValue::Number(65.0));
        assert_eq!(data.fields["windDirection"], FieldValue::Number(270.0));
        assert!(!data.fields.contains_key("waterTemperature"));
    }

    #[test]
    fn test_mda_empty_rejected() {
        let mut processor = MessageProcessor::default();
        assert!(!processor.process(&ParsedMessage::new("WIMDA", 0)).success);
    }

    #[test]
    fn test_mmb_inches() {
        let mut processor = MessageProcessor::default();
        let result = processor.process(&ParsedMessage::new("WIMMB", 0).with("pressureInches", 29.92));
        let pressure = result.updates[0].data.fields["barometricPressure"].as_f64().unwrap();
        assert!((pressure - 101_320.8).abs() < 1.0);
        let result = processor.process(&ParsedMessage::new("WIMMB", 0).with("pressureBars", 5.0));
        assert!(!result.success);
    }
}
