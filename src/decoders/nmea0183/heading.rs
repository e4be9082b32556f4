//! HDG, HDM, HDT, ROT

use crate::decoders::validation::{east_west, normalize_bearing, Range};
use crate::decoders::{DecodeContext, DecodeResult};
use marine_sens_types::{SensorData, SensorType};

/// Sensor heading with deviation and variation
///
/// Magnetic heading is the sensor heading corrected for deviation; true
/// heading additionally applies variation when it is known.
pub fn decode_hdg(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let sensor = reader.number("heading", Range::BEARING);
    let deviation = east_west(&mut reader, "deviation", "deviationDirection");
    let variation = east_west(&mut reader, "variation", "variationDirection");

    let mut data = SensorData::new();
    if let Some(sensor) = sensor {
        let magnetic = normalize_bearing(sensor + deviation.unwrap_or(0.0));
        data.set("magneticHeading", magnetic);
        match variation {
            Some(variation) => {
                let true_heading = normalize_bearing(magnetic + variation);
                data.set("trueHeading", true_heading);
                data.set("heading", true_heading);
            }
            None => data.set("heading", magnetic),
        }
    }
    if let Some(deviation) = deviation {
        data.set("deviation", deviation);
    }
    if let Some(variation) = variation {
        data.set("variation", variation);
    }
    reader.finish(vec![ctx.update(SensorType::Compass, data)])
}

pub fn decode_hdm(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let mut data = SensorData::new();
    if let Some(heading) = reader.number("heading", Range::BEARING) {
        data.set("magneticHeading", heading);
        data.set("heading", heading);
    }
    reader.finish(vec![ctx.update(SensorType::Compass, data)])
}

pub fn decode_hdt(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let mut data = SensorData::new();
    if let Some(heading) = reader.number("heading", Range::BEARING) {
        data.set("trueHeading", heading);
        data.set("heading", heading);
    }
    reader.finish(vec![ctx.update(SensorType::Compass, data)])
}

/// Rate of turn in degrees per minute, negative to port
pub fn decode_rot(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    reader.status("status");
    let mut data = SensorData::new();
    if let Some(rate) = reader.number("rateOfTurn", Range::RATE_OF_TURN) {
        data.set("rateOfTurn", rate);
    }
    reader.finish(vec![ctx.update(SensorType::Compass, data)])
}

#[cfg(test)]
mod tests {
    use crate::decoders::MessageProcessor;
    use marine_sens_types::{FieldValue, ParsedMessage};

    #[test]
    fn test_hdg_applies_deviation_and_variation() {
        let mut processor = MessageProcessor::default();
        let msg = ParsedMessage::new("HCHDG", 0)
            .with("heading", 358.0)
            .with("deviation", 1.0)
            .with("deviationDirection", "E")
            .with("variation", 4.0)
            .with("variationDirection", "E");
        let result = processor.process(&msg);
        let data = &result.updates[0].data;
        assert_eq!(data.fields["magneticHeading"], FieldValue::Number(359.0));
        assert_eq!(data.fields["trueHeading"], FieldValue::Number(3.0));
        assert_eq!(data.fields["heading"], FieldValue::Number(3.0));
    }

    #[test]
    fn test_hdg_without_corrections() {
        let mut processor = MessageProcessor::default();
        let result = processor.process(&ParsedMessage::new("HCHDG", 0).with("heading", 120.0));
        let data = &result.updates[0].data;
        assert_eq!(data.fields["heading"], FieldValue::Number(120.0));
        assert!(!data.fields.contains_key("trueHeading"));
    }

    #[test]
    fn test_hdt_and_rot() {
        let mut processor = MessageProcessor::default();
        let result = processor.process(&ParsedMessage::new("HEHDT", 0).with("heading", 271.5));
        assert_eq!(result.updates[0].data.fields["trueHeading"], FieldValue::Number(271.5));

        let result = processor.process(
            &ParsedMessage::new("TIROT", 0)
                .with("rateOfTurn", -35.2)
                .with("status", "A"),
        );
        assert_eq!(result.updates[0].data.fields["rateOfTurn"], FieldValue::Number(-35.2));
        let result = processor.process(&ParsedMessage::new("HEHDT", 0).with("heading", 400.0));
        assert!(!result.success);
    }
}
