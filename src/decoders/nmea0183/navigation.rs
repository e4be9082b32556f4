//! APB, XTE, RMB, BWC: route and waypoint guidance

use crate::decoders::validation::{FieldReader, Range};
use crate::decoders::{DecodeContext, DecodeResult, ValidationError};
use marine_sens_core::constants::{KNOTS_TO_MPS, NAUTICAL_MILE_M};
use marine_sens_types::{SensorData, SensorType};

const STEER: [&str; 2] = ["L", "R"];

/// Cross-track error magnitude in metres, honouring the optional unit flag
fn cross_track(reader: &mut FieldReader<'_>, data: &mut SensorData) {
    let factor = match reader.opt_code("xteUnits", &["N", "K"]).as_deref() {
        Some("K") => 1000.0,
        _ => NAUTICAL_MILE_M,
    };
    if let Some(xte) = reader.opt_converted("crossTrackError", |v| v.abs() * factor, Range::DISTANCE) {
        data.set("crossTrackError", xte);
    } else if !reader.has("crossTrackError") {
        reader.reject(ValidationError::Missing("crossTrackError".to_string()));
    }
    if let Some(direction) = reader.opt_code("steerDirection", &STEER) {
        data.set("steerDirection", direction);
    }
}

fn waypoint(reader: &FieldReader<'_>, key: &str, data: &mut SensorData) {
    if let Some(id) = reader.opt_text(key) {
        data.set("waypointId", id);
    }
}

/// Autopilot sentence B
pub fn decode_apb(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    reader.status("status");
    reader.status("cycleLockStatus");

    let mut data = SensorData::new();
    cross_track(&mut reader, &mut data);
    if let Some(bod) = reader.opt_number("bearingOriginToDestination", Range::BEARING) {
        data.set("bearingOriginToDestination", bod);
    }
    if let Some(btw) = reader.opt_number("bearingToDestination", Range::BEARING) {
        data.set("bearingToWaypoint", btw);
    }
    waypoint(&reader, "waypointId", &mut data);

    let mut updates = vec![ctx.update(SensorType::Navigation, data)];
    if let Some(target) = reader.opt_number("headingToSteer", Range::BEARING) {
        updates.push(ctx.update(
            SensorType::Autopilot,
            SensorData::new().with("headingTarget", target),
        ));
    }
    reader.finish(updates)
}

/// Cross-track error, measured
pub fn decode_xte(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    reader.status("status");
    reader.status("cycleLockStatus");

    let mut data = SensorData::new();
    cross_track(&mut reader, &mut data);
    reader.finish(vec![ctx.update(SensorType::Navigation, data)])
}

/// Recommended minimum navigation information
pub fn decode_rmb(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    reader.status("status");

    let mut data = SensorData::new();
    cross_track(&mut reader, &mut data);
    waypoint(&reader, "destinationWaypointId", &mut data);
    if let Some(range) = reader.opt_scaled("rangeToDestination", NAUTICAL_MILE_M, Range::DISTANCE) {
        data.set("distanceToWaypoint", range);
    }
    if let Some(bearing) = reader.opt_number("bearingToDestination", Range::BEARING) {
        data.set("bearingToWaypoint", bearing);
    }
    // closing velocity is negative when moving away
    if let Some(vmg) = reader.opt_scaled(
        "destinationClosingVelocity",
        KNOTS_TO_MPS,
        Range::new(-Range::SPEED.max, Range::SPEED.max),
    ) {
        data.set("velocityMadeGood", vmg);
    }
    reader.finish(vec![ctx.update(SensorType::Navigation, data)])
}

/// Bearing and distance to waypoint, great circle
pub fn decode_bwc(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let bearing = reader.number("bearingTrue", Range::BEARING);
    let distance = reader.scaled("distance", NAUTICAL_MILE_M, Range::DISTANCE);

    let mut data = SensorData::new();
    if let Some(bearing) = bearing {
        data.set("bearingToWaypoint", bearing);
    }
    if let Some(distance) = distance {
        data.set("distanceToWaypoint", distance);
    }
    waypoint(&reader, "waypointId", &mut data);
    reader.finish(vec![ctx.update(SensorType::Navigation, data)])
}
