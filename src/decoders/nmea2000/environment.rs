//! Temperature, humidity and pressure

use super::{celsius, instance};
use crate::decoders::validation::Range;
use crate::decoders::{DecodeContext, DecodeResult, ValidationError};
use marine_sens_types::{
    FieldUpdate, SensorContext, SensorData, SensorType, TemperatureContext, TemperatureLocation,
};

/// PGN 130312
///
/// The temperature source names the location and becomes the sensor's
/// reported context.
pub fn decode_temperature(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let instance = instance(&mut reader, ctx);
    let temperature = celsius(&mut reader, "actualTemperature");
    if !reader.has("actualTemperature") {
        reader.reject(ValidationError::Missing("actualTemperature".to_string()));
    }
    let source = reader.opt_text("source");

    let mut data = SensorData::new();
    if let Some(temperature) = temperature {
        data.set("value", temperature);
    }
    if let Some(source) = source {
        data.context = Some(SensorContext::Temperature(TemperatureContext {
            location: TemperatureLocation::from_wire(&source),
        }));
        data.set("source", source);
    }
    reader.finish(vec![FieldUpdate::new(SensorType::Temperature, instance, data)])
}

/// PGN 130313
pub fn decode_humidity(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let humidity = reader.number("actualHumidity", Range::PERCENT);

    let mut data = SensorData::new();
    if let Some(humidity) = humidity {
        data.set("humidity", humidity);
    }
    reader.finish(vec![ctx.update(SensorType::Weather, data)])
}

/// PGN 130314, atmospheric pressure only
pub fn decode_pressure(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let pressure = reader.number("pressure", Range::ATMOSPHERIC);

    let mut data = SensorData::new();
    if let Some(pressure) = pressure {
        data.set("barometricPressure", pressure);
    }
    reader.finish(vec![ctx.update(SensorType::Weather, data)])
}

#[cfg(test)]
mod tests {
    use crate::decoders::MessageProcessor;
    use marine_sens_types::{
        FieldValue, ParsedMessage, SensorContext, SensorType, TemperatureLocation,
    };

    #[test]
    fn test_temperature_source_sets_context() {
        let mut processor = MessageProcessor::default();
        let msg = ParsedMessage::new("PGN130312", 0)
            .with("instance", 2.0)
            .with("source", "Refrigeration Temperature")
            .with("actualTemperature", 277.15);
        let result = processor.process(&msg);
        let update = &result.updates[0];
        assert_eq!((update.sensor_type, update.instance), (SensorType::Temperature, 2));
        assert!((update.data.fields["value"].as_f64().unwrap() - 4.0).abs() < 1e-9);
        match &update.data.context {
            Some(SensorContext::Temperature(t)) => {
                assert_eq!(t.location, TemperatureLocation::Refrigerator)
            }
            other => panic!("unexpected context {:?}", other),
        }
    }

    #[test]
    fn test_pressure() {
        let mut processor = MessageProcessor::default();
        let result = processor.process(&ParsedMessage::new("PGN130314", 0).with("pressure", 101_325.0));
        assert_eq!(
            result.updates[0].data.fields["barometricPressure"],
            FieldValue::Number(101_325.0)
        );
        assert!(!processor
            .process(&ParsedMessage::new("PGN130314", 0).with("pressure", 500.0))
            .success);
    }

    #[test]
    fn test_humidity() {
        let mut processor = MessageProcessor::default();
        let result = processor.process(&ParsedMessage::new("PGN130313", 0).with("actualHumidity", 71.0));
        assert_eq!(result.updates[0].data.fields["humidity"], FieldValue::Number(71.0));
    }
}
