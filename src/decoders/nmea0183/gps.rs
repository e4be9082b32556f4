//! RMC, GGA, GLL, ZDA

use super::{date_ddmmyy, epoch_millis, time_of_day};
use crate::decoders::validation::{coordinate, east_west, FieldReader, Range};
use crate::decoders::{DecodeContext, DecodeResult, ValidationError};
use chrono::NaiveDate;
use marine_sens_core::constants::KNOTS_TO_MPS;
use marine_sens_types::{SensorData, SensorType};

fn position(reader: &mut FieldReader<'_>, data: &mut SensorData) {
    if let Some(lat) = coordinate(reader, "latitude", "latDirection", true) {
        data.set("latitude", lat);
    }
    if let Some(lon) = coordinate(reader, "longitude", "lonDirection", false) {
        data.set("longitude", lon);
    }
}

/// Recommended minimum data
pub fn decode_rmc(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    reader.status("status");

    let mut gps = SensorData::new();
    position(&mut reader, &mut gps);
    if let Some(sog) = reader.opt_scaled("speedKnots", KNOTS_TO_MPS, Range::SPEED) {
        gps.set("speedOverGround", sog);
    }
    if let Some(cog) = reader.opt_number("course", Range::BEARING) {
        gps.set("courseOverGround", cog);
    }
    let time = time_of_day(&mut reader, "time");
    let date = date_ddmmyy(&mut reader, "date");
    if let (Some(date), Some(time)) = (date, time) {
        gps.set("utcDateTime", epoch_millis(date, time));
    }
    if let Some(mode) = reader.opt_text("mode") {
        gps.set("positionMode", mode);
    }

    let mut updates = vec![ctx.update(SensorType::Gps, gps)];
    if let Some(variation) = east_west(&mut reader, "variation", "variationDirection") {
        updates.push(ctx.update(
            SensorType::Compass,
            SensorData::new().with("variation", variation),
        ));
    }
    reader.finish(updates)
}

/// Fix data
pub fn decode_gga(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    let fix = reader.number("fixQuality", Range::FIX_QUALITY);
    if fix == Some(0.0) {
        reader.reject(ValidationError::InvalidStatus {
            field: "fixQuality".into(),
            status: "0".into(),
        });
    }

    let mut gps = SensorData::new();
    position(&mut reader, &mut gps);
    if let Some(fix) = fix {
        gps.set("fixQuality", fix);
    }
    if let Some(sats) = reader.opt_number("satellites", Range::SATELLITES) {
        gps.set("numberOfSatellites", sats);
    }
    if let Some(hdop) = reader.opt_number("hdop", Range::DILUTION) {
        gps.set("horizontalDilutionOfPrecision", hdop);
    }
    if let Some(altitude) = reader.opt_number("altitude", Range::ALTITUDE) {
        gps.set("altitude", altitude);
    }
    reader.finish(vec![ctx.update(SensorType::Gps, gps)])
}

/// Geographic position
pub fn decode_gll(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    reader.status("status");
    let mut gps = SensorData::new();
    position(&mut reader, &mut gps);
    reader.finish(vec![ctx.update(SensorType::Gps, gps)])
}

/// Date and time
pub fn decode_zda(ctx: &DecodeContext) -> DecodeResult {
    let mut reader = ctx.reader();
    if !reader.has("time") {
        reader.reject(ValidationError::Missing("time".into()));
    }
    let time = time_of_day(&mut reader, "time");
    let day = reader.number("day", Range::new(1.0, 31.0));
    let month = reader.number("month", Range::new(1.0, 12.0));
    let year = reader.number("year", Range::new(1980.0, 2200.0));

    let mut gps = SensorData::new();
    if let (Some(time), Some(day), Some(month), Some(year)) = (time, day, month, year) {
        match NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32) {
            Some(date) => gps.set("utcDateTime", epoch_millis(date, time)),
            None => reader.reject(ValidationError::InvalidValue {
                field: "day".into(),
                value: format!("{}-{}-{}", year, month, day),
            }),
        }
    }
    reader.finish(vec![ctx.update(SensorType::Gps, gps)])
}
