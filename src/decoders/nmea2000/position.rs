//! Position, course over ground and route guidance

use super::{degrees, instance};
use crate::decoders::validation::{normalize_bearing, Range};
use crate::decoders::{DecodeContext, DecodeResult};
use marine_sens_types::{FieldUpdate, SensorData, SensorType};

/// PGN 129025
pub fn decode_position_rapid(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let latitude = reader.number("latitude", Range::LATITUDE);
    let longitude = reader.number("longitude", Range::LONGITUDE);

    let mut data = SensorData::new();
    if let (Some(latitude), Some(longitude)) = (latitude, longitude) {
        data.set("latitude", latitude);
        data.set("longitude", longitude);
    }
    reader.finish(vec![ctx.update(SensorType::Gps, data)])
}

/// PGN 129026
///
/// Speed over ground also feeds the speed sensor, like VTG does.
pub fn decode_cog_sog(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let cog = degrees(&mut reader, "cog", Range::new(0.0, 360.0));
    let sog = reader.opt_number("sog", Range::SPEED);

    let mut gps = SensorData::new();
    let mut speed = SensorData::new();
    if let Some(cog) = cog {
        gps.set("courseOverGround", normalize_bearing(cog));
    }
    if let Some(sog) = sog {
        gps.set("speedOverGround", sog);
        speed.set("overGround", sog);
    }
    reader.finish(vec![
        ctx.update(SensorType::Gps, gps),
        ctx.update(SensorType::Speed, speed),
    ])
}

/// PGN 129283
pub fn decode_cross_track_error(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let instance = instance(&mut reader, ctx);
    let xte = reader.number("xte", Range::new(-Range::DISTANCE.max, Range::DISTANCE.max));

    let mut data = SensorData::new();
    if let Some(xte) = xte {
        data.set("crossTrackError", xte.abs());
    }
    reader.finish(vec![FieldUpdate::new(SensorType::Navigation, instance, data)])
}

/// PGN 129284
pub fn decode_navigation_data(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let instance = instance(&mut reader, ctx);

    let mut data = SensorData::new();
    if let Some(distance) = reader.opt_number("distanceToWaypoint", Range::DISTANCE) {
        data.set("distanceToWaypoint", distance);
    }
    if let Some(bearing) = degrees(&mut reader, "bearingPositionToDestinationWaypoint", Range::new(0.0, 360.0)) {
        data.set("bearingToWaypoint", normalize_bearing(bearing));
    }
    if let Some(bearing) = degrees(&mut reader, "bearingOriginToDestinationWaypoint", Range::new(0.0, 360.0)) {
        data.set("bearingOriginToDestination", normalize_bearing(bearing));
    }
    if let Some(id) = reader.opt_text("destinationWaypointNumber") {
        data.set("waypointId", id);
    }
    if let Some(vmg) = reader.opt_number(
        "waypointClosingVelocity",
        Range::new(-Range::SPEED.max, Range::SPEED.max),
    ) {
        data.set("velocityMadeGood", vmg);
    }
    reader.finish(vec![FieldUpdate::new(SensorType::Navigation, instance, data)])
}

#[cfg(test)]
mod tests {
    use crate::decoders::MessageProcessor;
    use marine_sens_types::{FieldValue, ParsedMessage, SensorType};
    use std::f64::consts::PI;

    #[test]
    fn test_position_rapid() {
        let mut processor = MessageProcessor::default();
        let msg = ParsedMessage::new("PGN129025", 0)
            .with("latitude", 54.32)
            .with("longitude", 10.14);
        let result = processor.process(&msg);
        let data = &result.updates[0].data.fields;
        assert_eq!(data["latitude"], FieldValue::Number(54.32));
    }

    #[test]
    fn test_position_out_of_range() {
        let mut processor = MessageProcessor::default();
        let msg = ParsedMessage::new("PGN129025", 0)
            .with("latitude", 91.0)
            .with("longitude", 10.14);
        assert!(!processor.process(&msg).success);
    }

    #[test]
    fn test_cog_sog_feeds_gps_and_speed() {
        let mut processor = MessageProcessor::default();
        let msg = ParsedMessage::new("PGN129026", 0)
            .with("cog", PI)
            .with("sog", 3.0);
        let result = processor.process(&msg);
        assert_eq!(result.updates.len(), 2);
        let cog = result.updates[0].data.fields["courseOverGround"].as_f64().unwrap();
        assert!((cog - 180.0).abs() < 1e-9);
        assert_eq!(result.updates[1].sensor_type, SensorType::Speed);
    }

    #[test]
    fn test_navigation_data() {
        let mut processor = MessageProcessor::default();
        let msg = ParsedMessage::new("PGN129284", 0)
            .with("distanceToWaypoint", 1500.0)
            .with("bearingPositionToDestinationWaypoint", PI / 2.0)
            .with("destinationWaypointNumber", 7.0)
            .with("waypointClosingVelocity", 2.5);
        let result = processor.process(&msg);
        let data = &result.updates[0].data.fields;
        assert_eq!(data["waypointId"], FieldValue::Text("7".into()));
        assert_eq!(data["velocityMadeGood"], FieldValue::Number(2.5));
    }
}
