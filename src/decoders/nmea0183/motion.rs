//! VHW, VLW, VTG

use crate::decoders::validation::Range;
use crate::decoders::{DecodeContext, DecodeResult, ValidationError};
use marine_sens_core::constants::{KMH_TO_MPS, KNOTS_TO_MPS, NAUTICAL_MILE_M};
use marine_sens_types::{SensorData, SensorType};

/// Speed through water
pub fn decode_vhw(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let speed = reader.first_of(
        &[("speedKnots", KNOTS_TO_MPS), ("speedKmh", KMH_TO_MPS)],
        Range::SPEED,
    );
    let data = match speed {
        Some(speed) => SensorData::new().with("throughWater", speed),
        None => SensorData::new(),
    };
    reader.finish(vec![ctx.update(SensorType::Speed, data)])
}

/// Distance log in nautical miles
pub fn decode_vlw(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let total = reader.opt_scaled("totalDistance", NAUTICAL_MILE_M, Range::DISTANCE);
    let trip = reader.opt_scaled("tripDistance", NAUTICAL_MILE_M, Range::DISTANCE);
    if !reader.has("totalDistance") && !reader.has("tripDistance") {
        reader.reject(ValidationError::Missing("totalDistance".into()));
    }

    let mut data = SensorData::new();
    if let Some(total) = total {
        data.set("totalLog", total);
    }
    if let Some(trip) = trip {
        data.set("tripLog", trip);
    }
    reader.finish(vec![ctx.update(SensorType::Speed, data)])
}

/// Course and speed over ground, reported to both GPS and speed sensors
pub fn decode_vtg(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let course = reader.opt_number("courseTrue", Range::BEARING);
    let speed = reader.opt_first_of(
        &[("speedKnots", KNOTS_TO_MPS), ("speedKmh", KMH_TO_MPS)],
        Range::SPEED,
    );
    if !reader.has("courseTrue") && !reader.has("speedKnots") && !reader.has("speedKmh") {
        reader.reject(ValidationError::Missing("speedKnots".into()));
    }

    let mut gps = SensorData::new();
    let mut log = SensorData::new();
    if let Some(course) = course {
        gps.set("courseOverGround", course);
    }
    if let Some(speed) = speed {
        gps.set("speedOverGround", speed);
        log.set("overGround", speed);
    }
    reader.finish(vec![
        ctx.update(SensorType::Gps, gps),
        ctx.update(SensorType::Speed, log),
    ])
}

#[cfg(test)]
mod tests {
    use crate::decoders::MessageProcessor;
    use marine_sens_types::{ParsedMessage, SensorType};

    #[test]
    fn test_vhw_knots() {
        let mut processor = MessageProcessor::default();
        let result = processor.process(&ParsedMessage::new("VWVHW", 0).with("speedKnots", 6.0));
        let speed = result.updates[0].data.fields["throughWater"].as_f64().unwrap();
        assert!((speed - 3.086_664).abs() < 1e-6);
    }

    #[test]
    fn test_vlw_distances() {
        let mut processor = MessageProcessor::default();
        let result = processor.process(
            &ParsedMessage::new("VWVLW", 0)
                .with("totalDistance", 1200.5)
                .with("tripDistance", "12.0"),
        );
        let data = &result.updates[0].data;
        assert_eq!(data.fields["totalLog"].as_f64(), Some(1200.5 * 1852.0));
        assert_eq!(data.fields["tripLog"].as_f64(), Some(12.0 * 1852.0));
        assert!(!processor.process(&ParsedMessage::new("VWVLW", 0)).success);
    }

    #[test]
    fn test_vtg_feeds_gps_and_speed() {
        let mut processor = MessageProcessor::default();
        let result = processor.process(
            &ParsedMessage::new("GPVTG", 0)
                .with("courseTrue", 54.7)
                .with("speedKmh", 36.0),
        );
        assert_eq!(result.updates.len(), 2);
        assert_eq!(result.updates[0].sensor_type, SensorType::Gps);
        let sog = result.updates[0].data.fields["speedOverGround"].as_f64().unwrap();
        assert!((sog - 10.0).abs() < 1e-9);
        assert_eq!(
            result.updates[1].data.fields["overGround"],
            result.updates[0].data.fields["speedOverGround"]
        );
    }

    #[test]
    fn test_vtg_course_only() {
        let mut processor = MessageProcessor::default();
        let result = processor.process(&ParsedMessage::new("GPVTG", 0).with("courseTrue", 10.0));
        assert!(result.success);
        assert_eq!(result.updates.len(), 1);
    }
}
