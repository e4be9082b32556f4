//! MWV, MWD, VWR

use crate::decoders::validation::{FieldReader, Range};
use crate::decoders::{DecodeContext, DecodeResult};
use marine_sens_core::constants::{KMH_TO_MPS, KNOTS_TO_MPS};
use marine_sens_types::{SensorData, SensorType};

const MPH_TO_MPS: f64 = 0.44704;

/// Speed with a separate unit letter: K km/h, M m/s, N knots, S mph
fn speed_with_unit(reader: &mut FieldReader<'_>, key: &str, unit_key: &str) -> Option<f64> {
    let factor = match reader.opt_code(unit_key, &["K", "M", "N", "S"]).as_deref() {
        Some("K") => KMH_TO_MPS,
        Some("N") => KNOTS_TO_MPS,
        Some("S") => MPH_TO_MPS,
        _ => 1.0,
    };
    reader.opt_scaled(key, factor, Range::WIND_SPEED)
}

/// Wind angle relative to the bow, apparent (R) or true (T)
pub fn decode_mwv(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    reader.status("status");
    let reference = reader.code("reference", &["R", "T"]);
    let angle = reader.number("angle", Range::BEARING);
    let speed = speed_with_unit(&mut reader, "speed", "speedUnit");

    let (angle_key, speed_key) = match reference.as_deref() {
        Some("T") => ("trueDirection", "trueSpeed"),
        _ => ("apparentDirection", "apparentSpeed"),
    };
    let mut data = SensorData::new();
    if let Some(angle) = angle {
        data.set(angle_key, angle);
    }
    if let Some(speed) = speed {
        data.set(speed_key, speed);
    }
    reader.finish(vec![ctx.update(SensorType::Wind, data)])
}

/// True wind direction and speed
pub fn decode_mwd(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let direction = reader.number("directionTrue", Range::BEARING);
    let speed = reader.opt_first_of(
        &[("speedMps", 1.0), ("speedKnots", KNOTS_TO_MPS)],
        Range::WIND_SPEED,
    );
    let mut data = SensorData::new();
    if let Some(direction) = direction {
        data.set("trueDirection", direction);
    }
    if let Some(speed) = speed {
        data.set("trueSpeed", speed);
    }
    reader.finish(vec![ctx.update(SensorType::Wind, data)])
}

/// Relative wind: 0 to 180 degrees off the bow, to port (L) or starboard (R)
pub fn decode_vwr(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let angle = reader.number("angle", Range::new(0.0, 180.0));
    let side = reader.code("side", &["L", "R"]);
    let speed = reader.opt_first_of(
        &[
            ("speedMps", 1.0),
            ("speedKnots", KNOTS_TO_MPS),
            ("speedKmh", KMH_TO_MPS),
        ],
        Range::WIND_SPEED,
    );

    let mut data = SensorData::new();
    if let (Some(angle), Some(side)) = (angle, side) {
        let direction = if side == "L" && angle > 0.0 {
            360.0 - angle
        } else {
            angle
        };
        data.set("apparentDirection", direction);
    }
    if let Some(speed) = speed {
        data.set("apparentSpeed", speed);
    }
    reader.finish(vec![ctx.update(SensorType::Wind, data)])
}
