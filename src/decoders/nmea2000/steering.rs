//! Heading, rate of turn, rudder and autopilot control

use super::{degrees, instance};
use crate::decoders::validation::{normalize_bearing, Range};
use crate::decoders::{DecodeContext, DecodeResult, ValidationError};
use marine_sens_core::constants::RAD_TO_DEG;
use marine_sens_types::{FieldUpdate, SensorData, SensorType};

const FULL_TURN: Range = Range::new(-360.0, 360.0);

fn is_magnetic(reference: &str) -> bool {
    let lower = reference.to_ascii_lowercase();
    lower == "1" || lower.starts_with("magnetic")
}

/// PGN 127250
///
/// A magnetic reading is corrected for deviation; variation, when sent,
/// also yields the true heading.
pub fn decode_heading(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let heading = degrees(&mut reader, "heading", FULL_TURN);
    if heading.is_none() && !reader.has("heading") {
        reader.reject(ValidationError::Missing("heading".to_string()));
    }
    let deviation = degrees(&mut reader, "deviation", Range::SIGNED_ANGLE);
    let variation = degrees(&mut reader, "variation", Range::SIGNED_ANGLE);
    let magnetic = reader.opt_text("reference").map_or(false, |r| is_magnetic(&r));

    let mut data = SensorData::new();
    if let Some(heading) = heading {
        if magnetic {
            let corrected = normalize_bearing(heading + deviation.unwrap_or(0.0));
            data.set("magneticHeading", corrected);
            match variation {
                Some(variation) => {
                    let true_heading = normalize_bearing(corrected + variation);
                    data.set("trueHeading", true_heading);
                    data.set("heading", true_heading);
                }
                None => data.set("heading", corrected),
            }
        } else {
            let true_heading = normalize_bearing(heading);
            data.set("trueHeading", true_heading);
            data.set("heading", true_heading);
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

/// PGN 127251, rad/s to °/min
pub fn decode_rate_of_turn(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let rate = reader.scaled("rate", RAD_TO_DEG * 60.0, Range::RATE_OF_TURN);

    let mut data = SensorData::new();
    if let Some(rate) = rate {
        data.set("rateOfTurn", rate);
    }
    reader.finish(vec![ctx.update(SensorType::Compass, data)])
}

/// PGN 127245
pub fn decode_rudder(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let instance = instance(&mut reader, ctx);
    let position = reader.scaled("position", RAD_TO_DEG, Range::RUDDER);

    let mut data = SensorData::new();
    if let Some(position) = position {
        data.set("rudderAngle", position);
    }
    reader.finish(vec![FieldUpdate::new(SensorType::Rudder, instance, data)])
}

/// PGN 127237
pub fn decode_heading_track_control(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();

    let mut data = SensorData::new();
    if let Some(mode) = reader.opt_text("steeringMode") {
        data.set("mode", mode);
    }
    if let Some(state) = reader.opt_text("commandedRudderDirection") {
        data.set("state", state);
    }
    if let Some(target) = degrees(&mut reader, "headingToSteerCourse", FULL_TURN) {
        data.set("headingTarget", normalize_bearing(target));
    }
    if let Some(rudder) = degrees(&mut reader, "commandedRudderAngle", Range::RUDDER) {
        data.set("rudderAngle", rudder);
    }
    if let Some(off) = degrees(&mut reader, "offHeadingLimit", Range::SIGNED_ANGLE) {
        data.set("offCourse", off);
    }
    reader.finish(vec![ctx.update(SensorType::Autopilot, data)])
}
