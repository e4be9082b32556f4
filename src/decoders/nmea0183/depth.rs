//! DPT, DBT, DBK, DBS

use crate::decoders::validation::Range;
use crate::decoders::{DecodeContext, DecodeResult};
use marine_sens_core::constants::{FATHOMS_TO_M, FEET_TO_M};
use marine_sens_types::{SensorData, SensorType};

/// Depth below transducer with transducer offset
pub fn decode_dpt(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
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
    reader.finish(vec![ctx.update(SensorType::Depth, data)])
}

/// Depth in feet, metres and fathoms; the reference depends on the sentence
/// (DBT transducer, DBK keel, DBS surface)
pub fn decode_dbt(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let depth = reader.first_of(
        &[
            ("depthMeters", 1.0),
            ("depthFeet", FEET_TO_M),
            ("depthFathoms", FATHOMS_TO_M),
        ],
        Range::DEPTH,
    );

    let mut data = SensorData::new();
    if let Some(depth) = depth {
        data.set("depth", depth);
    }
    data.set("depthSource", ctx.kind);
    reader.finish(vec![ctx.update(SensorType::Depth, data)])
}

#[cfg(test)]
mod tests {
    use crate::decoders::MessageProcessor;
    use marine_sens_types::{FieldValue, ParsedMessage};

    #[test]
    fn test_dpt() {
        let mut processor = MessageProcessor::default();
        let result = processor.process(
            &ParsedMessage::new("SDDPT", 0)
                .with("depth", 12.4)
                .with("offset", -0.6),
        );
        assert!(result.success);
        let data = &result.updates[0].data;
        assert_eq!(data.fields["depth"], FieldValue::Number(12.4));
        assert_eq!(data.fields["offset"], FieldValue::Number(-0.6));
        assert_eq!(data.fields["depthSource"], FieldValue::from("DPT"));
    }

    #[test]
    fn test_dbt_prefers_meters_and_converts_feet() {
        let mut processor = MessageProcessor::default();
        let result = processor.process(
            &ParsedMessage::new("SDDBT", 0)
                .with("depthFeet", 33.0)
                .with("depthMeters", 10.1),
        );
        assert_eq!(result.updates[0].data.fields["depth"], FieldValue::Number(10.1));

        let result = processor.process(&ParsedMessage::new("SDDBK", 0).with("depthFeet", 10.0));
        let data = &result.updates[0].data;
        assert!((data.fields["depth"].as_f64().unwrap() - 3.048).abs() < 1e-9);
        assert_eq!(data.fields["depthSource"], FieldValue::from("DBK"));
    }

    #[test]
    fn test_negative_depth_rejected() {
        let mut processor = MessageProcessor::default();
        let result = processor.process(&ParsedMessage::new("SDDPT", 0).with("depth", -1.0));
        assert!(!result.success);
        assert!(result.updates.is_empty());
        let result = processor.process(&ParsedMessage::new("SDDBT", 0));
        assert!(!result.success);
    }
}
