//! NMEA 2000 PGN decoders
//!
//! Fields arrive already scaled to SI by the upstream CAN decoder. Angles
//! are radians and temperatures are kelvin; both are converted here. The
//! sensor instance comes from the PGN's own `instance` field.

mod electrical;
mod engine;
mod environment;
mod motion;
mod position;
mod steering;

use super::validation::{FieldReader, Range};
use super::{DecodeContext, MessageProcessor};
use marine_sens_core::constants::{KELVIN_OFFSET, RAD_TO_DEG};

const SECONDS_TO_HOURS: f64 = 1.0 / 3600.0;

pub fn register_all(processor: &mut MessageProcessor) {
    processor.register_pgn(127_508, electrical::decode_battery_status);
    processor.register_pgn(127_506, electrical::decode_dc_detailed_status);
    processor.register_pgn(127_505, electrical::decode_fluid_level);

    processor.register_pgn(127_488, engine::decode_engine_rapid);
    processor.register_pgn(127_489, engine::decode_engine_dynamic);

    processor.register_pgn(128_267, motion::decode_depth);
    processor.register_pgn(128_259, motion::decode_speed);
    processor.register_pgn(130_306, motion::decode_wind);

    processor.register_pgn(129_025, position::decode_position_rapid);
    processor.register_pgn(129_026, position::decode_cog_sog);
    processor.register_pgn(129_283, position::decode_cross_track_error);
    processor.register_pgn(129_284, position::decode_navigation_data);

    processor.register_pgn(127_250, steering::decode_heading);
    processor.register_pgn(127_251, steering::decode_rate_of_turn);
    processor.register_pgn(127_245, steering::decode_rudder);
    processor.register_pgn(127_237, steering::decode_heading_track_control);

    processor.register_pgn(130_312, environment::decode_temperature);
    processor.register_pgn(130_313, environment::decode_humidity);
    processor.register_pgn(130_314, environment::decode_pressure);
}

/// Device instance, falling back to the context default
fn instance(reader: &mut FieldReader<'_>, ctx: &DecodeContext) -> u8 {
    reader
        .opt_number("instance", Range::INSTANCE)
        .map_or(ctx.instance, |n| n as u8)
}

/// Radians to degrees, checked against a range in degrees
fn degrees(reader: &mut FieldReader<'_>, key: &str, range: Range) -> Option<f64> {
    reader.opt_scaled(key, RAD_TO_DEG, range)
}

/// Kelvin to °C
fn celsius(reader: &mut FieldReader<'_>, key: &str) -> Option<f64> {
    reader.opt_converted(key, |k| k - KELVIN_OFFSET, Range::TEMPERATURE)
}
