//! Field validation shared by all decoders
//!
//! A [`FieldReader`] collects every problem it finds instead of stopping at
//! the first one, so a rejected message reports all of its bad fields.

use marine_sens_types::{FieldValue, ParsedMessage};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("missing required field '{0}'")]
    Missing(String),

    #[error("field '{field}' is not a number: '{value}'")]
    NotANumber { field: String, value: String },

    #[error("field '{0}' is not a finite number")]
    NonFinite(String),

    #[error("field '{field}' = {value} outside [{min}, {max}]")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("status '{status}' in '{field}' marks the data invalid")]
    InvalidStatus { field: String, status: String },

    #[error("field '{field}' has unexpected value '{value}'")]
    InvalidValue { field: String, value: String },
}

/// Physically plausible bounds, in canonical units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub const DEPTH: Range = Range::new(0.0, 11_000.0);
    pub const DEPTH_OFFSET: Range = Range::new(-100.0, 100.0);
    pub const SPEED: Range = Range::new(0.0, 100.0);
    pub const WIND_SPEED: Range = Range::new(0.0, 100.0);
    pub const DISTANCE: Range = Range::new(0.0, 1.0e9);
    pub const ALTITUDE: Range = Range::new(-1_000.0, 20_000.0);
    pub const BEARING: Range = Range::new(0.0, 360.0);
    pub const SIGNED_ANGLE: Range = Range::new(-180.0, 180.0);
    pub const RUDDER: Range = Range::new(-90.0, 90.0);
    pub const LATITUDE: Range = Range::new(-90.0, 90.0);
    pub const LONGITUDE: Range = Range::new(-180.0, 180.0);
    pub const RATE_OF_TURN: Range = Range::new(-3_600.0, 3_600.0);
    pub const TEMPERATURE: Range = Range::new(-60.0, 250.0);
    pub const PRESSURE: Range = Range::new(0.0, 2.0e7);
    pub const ATMOSPHERIC: Range = Range::new(50_000.0, 120_000.0);
    pub const VOLTAGE: Range = Range::new(0.0, 1_000.0);
    pub const CURRENT: Range = Range::new(-5_000.0, 5_000.0);
    pub const PERCENT: Range = Range::new(0.0, 100.0);
    pub const RPM: Range = Range::new(0.0, 20_000.0);
    pub const HOURS: Range = Range::new(0.0, 1.0e6);
    pub const FLOW: Range = Range::new(0.0, 10_000.0);
    pub const VOLUME: Range = Range::new(0.0, 1.0e6);
    pub const SATELLITES: Range = Range::new(0.0, 99.0);
    pub const DILUTION: Range = Range::new(0.0, 100.0);
    pub const FIX_QUALITY: Range = Range::new(0.0, 9.0);
    pub const INSTANCE: Range = Range::new(0.0, 255.0);
    pub const ANY: Range = Range::new(f64::MIN, f64::MAX);
}

/// Reads typed fields out of a message, recording what is wrong with them
pub struct FieldReader<'a> {
    msg: &'a ParsedMessage,
    errors: Vec<ValidationError>,
}

impl<'a> FieldReader<'a> {
    pub fn new(msg: &'a ParsedMessage) -> Self {
        Self {
            msg,
            errors: Vec::new(),
        }
    }

    /// Raw value; empty strings count as absent
    pub fn raw(&self, key: &str) -> Option<&'a FieldValue> {
        match self.msg.fields.get(key)? {
            FieldValue::Text(s) if s.trim().is_empty() => None,
            value => Some(value),
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.raw(key).is_some()
    }

    /// Record a problem found by the decoder itself
    pub fn reject(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn parse(&mut self, key: &str, value: &FieldValue) -> Option<f64> {
        let number = match value {
            FieldValue::Number(n) => *n,
            FieldValue::Text(s) => match s.trim().parse::<f64>() {
                Ok(n) => n,
                Err(_) => {
                    self.reject(ValidationError::NotANumber {
                        field: key.to_string(),
                        value: s.clone(),
                    });
                    return None;
                }
            },
        };
        if !number.is_finite() {
            self.reject(ValidationError::NonFinite(key.to_string()));
            return None;
        }
        Some(number)
    }

    fn check(&mut self, key: &str, value: f64, range: Range) -> Option<f64> {
        if range.contains(value) {
            Some(value)
        } else {
            self.reject(ValidationError::OutOfRange {
                field: key.to_string(),
                value,
                min: range.min,
                max: range.max,
            });
            None
        }
    }

    /// Optional number, scaled into canonical units, then range-checked
    pub fn opt_scaled(&mut self, key: &str, factor: f64, range: Range) -> Option<f64> {
        let raw = self.raw(key)?;
        let value = self.parse(key, raw)? * factor;
        self.check(key, value, range)
    }

    /// Optional number in canonical units
    pub fn opt_number(&mut self, key: &str, range: Range) -> Option<f64> {
        self.opt_scaled(key, 1.0, range)
    }

    /// Required number in canonical units
    pub fn number(&mut self, key: &str, range: Range) -> Option<f64> {
        self.scaled(key, 1.0, range)
    }

    /// Required number, scaled into canonical units
    pub fn scaled(&mut self, key: &str, factor: f64, range: Range) -> Option<f64> {
        if !self.has(key) {
            self.reject(ValidationError::Missing(key.to_string()));
            return None;
        }
        self.opt_scaled(key, factor, range)
    }

    /// Optional number converted by an arbitrary function before the range check
    pub fn opt_converted(&mut self, key: &str, convert: impl Fn(f64) -> f64, range: Range) -> Option<f64> {
        let raw = self.raw(key)?;
        let value = convert(self.parse(key, raw)?);
        self.check(key, value, range)
    }

    /// First of several alternative fields that is present, each with its
    /// own scale factor; records `Missing` for the first key if none is
    pub fn first_of(&mut self, alternatives: &[(&str, f64)], range: Range) -> Option<f64> {
        match alternatives.iter().find(|(key, _)| self.has(key)) {
            Some((key, factor)) => self.opt_scaled(key, *factor, range),
            None => {
                let key = alternatives.first().map_or("", |(key, _)| *key);
                self.reject(ValidationError::Missing(key.to_string()));
                None
            }
        }
    }

    /// Like [`Self::first_of`] but absence is fine
    pub fn opt_first_of(&mut self, alternatives: &[(&str, f64)], range: Range) -> Option<f64> {
        let (key, factor) = alternatives.iter().find(|(key, _)| self.has(key))?;
        self.opt_scaled(key, *factor, range)
    }

    /// Optional text; numbers are rendered as text
    pub fn opt_text(&self, key: &str) -> Option<String> {
        match self.raw(key)? {
            FieldValue::Text(s) => Some(s.trim().to_string()),
            FieldValue::Number(n) => Some(format!("{}", n)),
        }
    }

    pub fn text(&mut self, key: &str) -> Option<String> {
        let value = self.opt_text(key);
        if value.is_none() {
            self.reject(ValidationError::Missing(key.to_string()));
        }
        value
    }

    /// Optional single-letter code, upper-cased and checked against `allowed`
    pub fn opt_code(&mut self, key: &str, allowed: &[&str]) -> Option<String> {
        let value = self.opt_text(key)?.to_ascii_uppercase();
        if allowed.contains(&value.as_str()) {
            Some(value)
        } else {
            self.reject(ValidationError::InvalidValue {
                field: key.to_string(),
                value,
            });
            None
        }
    }

    pub fn code(&mut self, key: &str, allowed: &[&str]) -> Option<String> {
        if !self.has(key) {
            self.reject(ValidationError::Missing(key.to_string()));
            return None;
        }
        self.opt_code(key, allowed)
    }

    /// NMEA status flag: `A` is valid, `V` rejects the message
    ///
    /// A missing status is accepted.
    pub fn status(&mut self, key: &str) {
        if let Some(status) = self.opt_text(key) {
            if !status.eq_ignore_ascii_case("A") {
                self.reject(ValidationError::InvalidStatus {
                    field: key.to_string(),
                    status,
                });
            }
        }
    }

    /// Hand back `value` if nothing was rejected, otherwise every error
    pub fn finish<T>(self, value: T) -> Result<T, Vec<ValidationError>> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self.errors)
        }
    }
}

/// Latitude or longitude
///
/// With a hemisphere field the value is NMEA `ddmm.mmmm` (`dddmm.mmmm` for
/// longitude); without one it is signed decimal degrees.
pub fn coordinate(
    reader: &mut FieldReader<'_>,
    key: &str,
    hemisphere_key: &str,
    latitude: bool,
) -> Option<f64> {
    let (range, negative) = if latitude {
        (Range::LATITUDE, "S")
    } else {
        (Range::LONGITUDE, "W")
    };
    if !reader.has(key) {
        reader.reject(ValidationError::Missing(key.to_string()));
        return None;
    }

    let Some(hemisphere) = reader.opt_text(hemisphere_key) else {
        return reader.number(key, range);
    };
    let allowed: &[&str] = if latitude { &["N", "S"] } else { &["E", "W"] };
    let hemisphere = reader.code(hemisphere_key, allowed)?;
    let raw = reader.number(key, Range::new(0.0, if latitude { 9_000.0 } else { 18_000.0 }))?;

    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    if minutes >= 60.0 {
        reader.reject(ValidationError::OutOfRange {
            field: key.to_string(),
            value: minutes,
            min: 0.0,
            max: 60.0,
        });
        return None;
    }
    let value = degrees + minutes / 60.0;
    let signed = if hemisphere == negative { -value } else { value };
    if range.contains(signed) {
        Some(signed)
    } else {
        reader.reject(ValidationError::OutOfRange {
            field: key.to_string(),
            value: signed,
            min: range.min,
            max: range.max,
        });
        None
    }
}

/// Angle with an `E`/`W` direction field, east positive
pub fn east_west(reader: &mut FieldReader<'_>, key: &str, direction_key: &str) -> Option<f64> {
    let magnitude = reader.opt_number(key, Range::SIGNED_ANGLE)?;
    match reader.opt_code(direction_key, &["E", "W"]).as_deref() {
        Some("W") => Some(-magnitude.abs()),
        Some(_) => Some(magnitude.abs()),
        None => Some(magnitude),
    }
}

/// Normalize an angle to `[0, 360)`
pub fn normalize_bearing(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
