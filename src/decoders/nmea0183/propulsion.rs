//! RPM and RSA

use crate::decoders::validation::Range;
use crate::decoders::{DecodeContext, DecodeResult};
use marine_sens_types::{FieldUpdate, SensorData, SensorType};

/// Engine or shaft revolutions
///
/// The engine/shaft number is the sensor instance, taken as sent.
pub fn decode_rpm(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let source = reader.code("source", &["E", "S"]);
    let instance = reader.opt_number("number", Range::INSTANCE);
    let rpm = reader.number("rpm", Range::RPM);
    reader.status("status");

    let key = match source.as_deref() {
        Some("S") => "shaftRpm",
        _ => "rpm",
    };
    let mut data = SensorData::new();
    if let Some(rpm) = rpm {
        data.set(key, rpm);
    }
    let instance = instance.map_or(ctx.instance, |n| n as u8);
    reader.finish(vec![FieldUpdate::new(SensorType::Engine, instance, data)])
}

/// Rudder sensor angle; the starboard (or single) rudder is reported
pub fn decode_rsa(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let angle = reader.number("starboard", Range::RUDDER);
    reader.status("starboardStatus");

    let mut data = SensorData::new();
    if let Some(angle) = angle {
        data.set("rudderAngle", angle);
    }
    reader.finish(vec![ctx.update(SensorType::Rudder, data)])
}

#[cfg(test)]
mod tests {
    use crate::decoders::MessageProcessor;
    use marine_sens_types::{FieldValue, ParsedMessage, SensorType};

    #[test]
    fn test_engine_rpm_uses_number_as_instance() {
        let mut processor = MessageProcessor::default();
        let msg = ParsedMessage::new("IIRPM", 0)
            .with("source", "E")
            .with("number", 2.0)
            .with("rpm", 1850.0)
            .with("status", "A");
        let result = processor.process(&msg);
        assert!(result.success);
        let update = &result.updates[0];
        assert_eq!((update.sensor_type, update.instance), (SensorType::Engine, 2));
        assert_eq!(update.data.fields["rpm"], FieldValue::Number(1850.0));
    }

    #[test]
    fn test_shaft_rpm() {
        let mut processor = MessageProcessor::default();
        let msg = ParsedMessage::new("IIRPM", 0)
            .with("source", "S")
            .with("number", 1.0)
            .with("rpm", 900.0);
        let result = processor.process(&msg);
        assert!(result.updates[0].data.fields.contains_key("shaftRpm"));
    }

    #[test]
    fn test_rpm_invalid_status() {
        let mut processor = MessageProcessor::default();
        let msg = ParsedMessage::new("IIRPM", 0)
            .with("source", "E")
            .with("rpm", 900.0)
            .with("status", "V");
        assert!(!processor.process(&msg).success);
    }

    #[test]
    fn test_rsa() {
        let mut processor = MessageProcessor::default();
        let msg = ParsedMessage::new("AGRSA", 0)
            .with("starboard", -12.5)
            .with("starboardStatus", "A");
        let result = processor.process(&msg);
        assert_eq!(result.updates[0].sensor_type, SensorType::Rudder);
        assert_eq!(result.updates[0].data.fields["rudderAngle"], FieldValue::Number(-12.5));
    }

    #[test]
    fn test_rsa_out_of_range() {
        let mut processor = MessageProcessor::default();
        let msg = ParsedMessage::new("AGRSA", 0).with("starboard", 120.0);
        assert!(!processor.process(&msg).success);
    }
}
