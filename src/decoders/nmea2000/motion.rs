//! Water depth, speed and wind data

use super::{degrees, instance};
use crate::decoders::validation::{normalize_bearing, Range};
use crate::decoders::{DecodeContext, DecodeResult, ValidationError};
use marine_sens_types::{FieldUpdate, SensorData, SensorType};

/// PGN 128267
pub fn decode_depth(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let instance = instance(&mut reader, ctx);
    let depth = reader.number("depth", Range::DEPTH);
    let offset = reader.opt_number("offset", Range::DEPTH_OFFSET);

    let mut data = SensorData::new();
    if let Some(depth) = depth {
        data.set("depth", depth);
    }
    if let Some(offset) = offset {
        data.set("offset", offset);
    }
    data.set("depthSource", ctx.kind);
    reader.finish(vec![FieldUpdate::new(SensorType::Depth, instance, data)])
}

/// PGN 128259
pub fn decode_speed(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let instance = instance(&mut reader, ctx);

    let mut data = SensorData::new();
    if let Some(stw) = reader.opt_number("speedWaterReferenced", Range::SPEED) {
        data.set("throughWater", stw);
    }
    if let Some(sog) = reader.opt_number("speedGroundReferenced", Range::SPEED) {
        data.set("overGround", sog);
    }
    if data.is_empty() && reader.is_ok() {
        reader.reject(ValidationError::Missing("speedWaterReferenced".to_string()));
    }
    reader.finish(vec![FieldUpdate::new(SensorType::Speed, instance, data)])
}

/// Wind reference, numeric code or name: apparent or some kind of true
fn is_apparent(reference: &str) -> bool {
    let lower = reference.to_ascii_lowercase();
    lower == "2" || lower.starts_with("apparent")
}

/// PGN 130306
///
/// A missing reference is read as apparent wind.
pub fn decode_wind(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let instance = instance(&mut reader, ctx);
    let speed = reader.number("windSpeed", Range::WIND_SPEED);
    let angle = degrees(&mut reader, "windAngle", Range::new(-360.0, 360.0));
    if !reader.has("windAngle") {
        reader.reject(ValidationError::Missing("windAngle".to_string()));
    }
    let apparent = reader.opt_text("reference").map_or(true, |r| is_apparent(&r));

    let (speed_key, angle_key) = if apparent {
        ("apparentSpeed", "apparentDirection")
    } else {
        ("trueSpeed", "trueDirection")
    };
    let mut data = SensorData::new();
    if let Some(speed) = speed {
        data.set(speed_key, speed);
    }
    if let Some(angle) = angle {
        data.set(angle_key, normalize_bearing(angle));
    }
    reader.finish(vec![FieldUpdate::new(SensorType::Wind, instance, data)])
}

#[cfg(test)]
mod tests {
    use crate::decoders::MessageProcessor;
    use marine_sens_types::{FieldValue, ParsedMessage};
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_depth_source_is_pgn() {
        let mut processor = MessageProcessor::default();
        let result = processor.process(
            &ParsedMessage::new("128267", 0)
                .with("depth", 8.2)
                .with("offset", 0.4),
        );
        let data = &result.updates[0].data.fields;
        assert_eq!(data["depthSource"], FieldValue::Text("PGN128267".into()));
        assert_eq!(data["offset"], FieldValue::Number(0.4));
    }

    #[test]
    fn test_speed_needs_a_value() {
        let mut processor = MessageProcessor::default();
        assert!(!processor.process(&ParsedMessage::new("PGN128259", 0)).success);
        let result = processor.process(
            &ParsedMessage::new("PGN128259", 0).with("speedWaterReferenced", 3.1),
        );
        assert_eq!(result.updates[0].data.fields["throughWater"], FieldValue::Number(3.1));
    }

    #[test]
    fn test_wind_radians_to_degrees() {
        let mut processor = MessageProcessor::default();
        let msg = ParsedMessage::new("PGN130306", 0)
            .with("windSpeed", 6.0)
            .with("windAngle", FRAC_PI_2)
            .with("reference", "Apparent");
        let result = processor.process(&msg);
        let data = &result.updates[0].data.fields;
        assert!((data["apparentDirection"].as_f64().unwrap() - 90.0).abs() < 1e-9);
        assert_eq!(data["apparentSpeed"], FieldValue::Number(6.0));
    }

    #[test]
    fn test_true_wind_reference() {
        let mut processor = MessageProcessor::default();
        let msg = ParsedMessage::new("PGN130306", 0)
            .with("windSpeed", 6.0)
            .with("windAngle", -FRAC_PI_2)
            .with("reference", "True (boat referenced)");
        let result = processor.process(&msg);
        let data = &result.updates[0].data.fields;
        assert!((data["trueDirection"].as_f64().unwrap() - 270.0).abs() < 1e-9);
        assert!(!data.contains_key("apparentSpeed"));
    }
}
