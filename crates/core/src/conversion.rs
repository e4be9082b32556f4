//! Conversion registry: how each data category is presented per region
//!
//! Every (category, region) pair must resolve to a presentation. The table is
//! checked completely when the registry is built, so a missing mapping is a
//! startup failure rather than a silent fallback at runtime.

use marine_sens_types::{DataCategory, PresentationConfig, UnitRegion};
use std::collections::HashMap;
use thiserror::Error;

use crate::constants::NO_DATA;

/// Problems found while validating the presentation table
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("no presentation for {category} in region {region}")]
    MissingMapping {
        category: DataCategory,
        region: UnitRegion,
    },

    #[error("unknown presentation '{0}'")]
    UnknownPresentation(String),

    #[error("presentation '{id}' is for {found}, not {expected}")]
    CategoryMismatch {
        id: String,
        expected: DataCategory,
        found: DataCategory,
    },

    #[error("presentation '{0}' is defined twice")]
    DuplicateId(String),

    #[error("presentation '{0}' has a non-finite or zero factor")]
    InvalidFactor(String),
}

/// Mapping from canonical value to display value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Conversion {
    Identity,
    /// `display = si * factor + offset`
    Linear { factor: f64, offset: f64 },
}

impl Conversion {
    pub const fn scale(factor: f64) -> Self {
        Conversion::Linear {
            factor,
            offset: 0.0,
        }
    }

    pub fn apply(&self, si: f64) -> f64 {
        match self {
            Conversion::Identity => si,
            Conversion::Linear { factor, offset } => si * factor + offset,
        }
    }

    fn is_valid(&self) -> bool {
        match self {
            Conversion::Identity => true,
            Conversion::Linear { factor, offset } => {
                factor.is_finite() && *factor != 0.0 && offset.is_finite()
            }
        }
    }
}

/// How a display value is rendered as text
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Format {
    /// Fixed number of decimals
    Fixed(u8),
    /// Whole numbers without decimals, otherwise one decimal
    Compact,
    /// Degrees and decimal minutes with a hemisphere letter
    DegreesMinutes { positive: char, negative: char },
    /// Hours rendered as `h:mm`
    HoursMinutes,
    /// Epoch milliseconds rendered as a UTC date and time
    Timestamp,
    /// Passed through unchanged
    Text,
}

/// Conversion factor, formatter and unit symbol for one category
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Presentation {
    pub id: &'static str,
    pub category: DataCategory,
    pub unit: &'static str,
    pub conversion: Conversion,
    pub format: Format,
}

impl Presentation {
    pub const fn new(
        id: &'static str,
        category: DataCategory,
        unit: &'static str,
        conversion: Conversion,
        format: Format,
    ) -> Self {
        Self {
            id,
            category,
            unit,
            conversion,
            format,
        }
    }

    /// Convert a canonical value into this presentation's unit
    pub fn convert(&self, si: f64) -> f64 {
        self.conversion.apply(si)
    }

    /// Render an already converted value
    pub fn format_value(&self, display: f64) -> String {
        if !display.is_finite() {
            return NO_DATA.to_string();
        }
        match self.format {
            Format::Fixed(decimals) => fixed(display, decimals as usize),
            Format::Compact => {
                if (display - display.round()).abs() < 1e-9 {
                    fixed(display, 0)
                } else {
                    fixed(display, 1)
                }
            }
            Format::DegreesMinutes { positive, negative } => {
                let hemisphere = if display < 0.0 { negative } else { positive };
                let thousandths = (display.abs() * 60_000.0).round() as i64;
                let degrees = thousandths / 60_000;
                let minutes = (thousandths % 60_000) as f64 / 1_000.0;
                format!("{}° {:06.3}' {}", degrees, minutes, hemisphere)
            }
            Format::HoursMinutes => {
                let total_minutes = (display * 60.0).round() as i64;
                format!("{}:{:02}", total_minutes / 60, (total_minutes % 60).abs())
            }
            Format::Timestamp => chrono::DateTime::from_timestamp_millis(display as i64)
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| NO_DATA.to_string()),
            Format::Text => format!("{}", display),
        }
    }

    /// Append the unit symbol to a formatted value
    pub fn with_unit(&self, formatted: &str) -> String {
        match self.unit {
            "" => formatted.to_string(),
            "°" | "%" => format!("{}{}", formatted, self.unit),
            unit => format!("{} {}", formatted, unit),
        }
    }
}

fn fixed(value: f64, decimals: usize) -> String {
    let text = format!("{:.*}", decimals, value);
    // Avoid "-0.0" for values that round to zero
    if text.starts_with('-') && text[1..].chars().all(|c| c == '0' || c == '.') {
        text[1..].to_string()
    } else {
        text
    }
}

use Conversion::{Identity, Linear};
use DataCategory as C;
use Format::{Compact, DegreesMinutes, Fixed, HoursMinutes, Timestamp};

/// Every built-in presentation
pub static BUILTIN_PRESENTATIONS: &[Presentation] = &[
    Presentation::new("depth.m", C::Depth, "m", Identity, Fixed(1)),
    Presentation::new("depth.ft", C::Depth, "ft", Conversion::scale(3.280_84), Fixed(1)),
    Presentation::new("depth.fathom", C::Depth, "fm", Conversion::scale(0.546_807), Fixed(1)),
    Presentation::new("speed.kn", C::Speed, "kn", Conversion::scale(1.943_844), Fixed(1)),
    Presentation::new("speed.kmh", C::Speed, "km/h", Conversion::scale(3.6), Fixed(1)),
    Presentation::new("speed.mph", C::Speed, "mph", Conversion::scale(2.236_936), Fixed(1)),
    Presentation::new("speed.ms", C::Speed, "m/s", Identity, Fixed(1)),
    Presentation::new("windSpeed.kn", C::WindSpeed, "kn", Conversion::scale(1.943_844), Fixed(1)),
    Presentation::new("windSpeed.ms", C::WindSpeed, "m/s", Identity, Fixed(1)),
    Presentation::new("windSpeed.kmh", C::WindSpeed, "km/h", Conversion::scale(3.6), Fixed(0)),
    Presentation::new("windSpeed.mph", C::WindSpeed, "mph", Conversion::scale(2.236_936), Fixed(0)),
    Presentation::new("angle.deg", C::Angle, "°", Identity, Fixed(0)),
    Presentation::new("angle.rad", C::Angle, "rad", Conversion::scale(std::f64::consts::PI / 180.0), Fixed(3)),
    Presentation::new("temperature.c", C::Temperature, "°C", Identity, Fixed(1)),
    Presentation::new("temperature.f", C::Temperature, "°F", Linear { factor: 1.8, offset: 32.0 }, Fixed(1)),
    Presentation::new("pressure.kpa", C::Pressure, "kPa", Conversion::scale(0.001), Fixed(0)),
    Presentation::new("pressure.bar", C::Pressure, "bar", Conversion::scale(0.000_01), Fixed(2)),
    Presentation::new("pressure.psi", C::Pressure, "psi", Conversion::scale(0.000_145_038), Fixed(0)),
    Presentation::new("atmosphericPressure.hpa", C::AtmosphericPressure, "hPa", Conversion::scale(0.01), Fixed(1)),
    Presentation::new("atmosphericPressure.mbar", C::AtmosphericPressure, "mbar", Conversion::scale(0.01), Fixed(0)),
    Presentation::new("atmosphericPressure.inhg", C::AtmosphericPressure, "inHg", Conversion::scale(0.000_295_3), Fixed(2)),
    Presentation::new("atmosphericPressure.mmhg", C::AtmosphericPressure, "mmHg", Conversion::scale(0.007_500_62), Fixed(0)),
    Presentation::new("voltage.v", C::Voltage, "V", Identity, Fixed(2)),
    Presentation::new("current.a", C::Current, "A", Identity, Fixed(1)),
    Presentation::new("power.w", C::Power, "W", Identity, Fixed(0)),
    Presentation::new("power.kw", C::Power, "kW", Conversion::scale(0.001), Fixed(2)),
    Presentation::new("capacity.ah", C::Capacity, "Ah", Identity, Fixed(0)),
    Presentation::new("volume.l", C::Volume, "L", Identity, Fixed(0)),
    Presentation::new("volume.galus", C::Volume, "gal", Conversion::scale(0.264_172), Fixed(1)),
    Presentation::new("volume.galuk", C::Volume, "gal", Conversion::scale(0.219_969), Fixed(1)),
    Presentation::new("flowRate.lh", C::FlowRate, "L/h", Identity, Fixed(1)),
    Presentation::new("flowRate.galush", C::FlowRate, "gal/h", Conversion::scale(0.264_172), Fixed(1)),
    Presentation::new("rpm.rpm", C::Rpm, "rpm", Identity, Fixed(0)),
    Presentation::new("rateOfTurn.degmin", C::RateOfTurn, "°/min", Identity, Fixed(0)),
    Presentation::new("rateOfTurn.degs", C::RateOfTurn, "°/s", Conversion::scale(1.0 / 60.0), Fixed(1)),
    Presentation::new("percentage.pct", C::Percentage, "%", Identity, Fixed(0)),
    Presentation::new("humidity.pct", C::Humidity, "%", Identity, Fixed(0)),
    Presentation::new("duration.h", C::Duration, "h", Identity, Fixed(1)),
    Presentation::new("duration.hmm", C::Duration, "", Identity, HoursMinutes),
    Presentation::new("distance.nm", C::Distance, "nm", Conversion::scale(1.0 / 1852.0), Fixed(2)),
    Presentation::new("distance.km", C::Distance, "km", Conversion::scale(0.001), Fixed(2)),
    Presentation::new("distance.mi", C::Distance, "mi", Conversion::scale(0.000_621_371), Fixed(2)),
    Presentation::new("distance.m", C::Distance, "m", Identity, Fixed(0)),
    Presentation::new("latitude.dm", C::Latitude, "", Identity, DegreesMinutes { positive: 'N', negative: 'S' }),
    Presentation::new("latitude.dd", C::Latitude, "°", Identity, Fixed(5)),
    Presentation::new("longitude.dm", C::Longitude, "", Identity, DegreesMinutes { positive: 'E', negative: 'W' }),
    Presentation::new("longitude.dd", C::Longitude, "°", Identity, Fixed(5)),
    Presentation::new("count.n", C::Count, "", Identity, Compact),
    Presentation::new("dateTime.utc", C::DateTime, "UTC", Identity, Timestamp),
    Presentation::new("text.plain", C::Text, "", Identity, Format::Text),
];

/// Region defaults as (category, [metric, imperial, nauticalEu, nauticalUs])
pub static BUILTIN_DEFAULTS: &[(DataCategory, [&str; 4])] = &[
    (C::Depth, ["depth.m", "depth.ft", "depth.m", "depth.ft"]),
    (C::Speed, ["speed.kmh", "speed.mph", "speed.kn", "speed.kn"]),
    (C::WindSpeed, ["windSpeed.ms", "windSpeed.mph", "windSpeed.kn", "windSpeed.kn"]),
    (C::Angle, ["angle.deg", "angle.deg", "angle.deg", "angle.deg"]),
    (C::Temperature, ["temperature.c", "temperature.f", "temperature.c", "temperature.f"]),
    (C::Pressure, ["pressure.kpa", "pressure.psi", "pressure.bar", "pressure.psi"]),
    (C::AtmosphericPressure, ["atmosphericPressure.hpa", "atmosphericPressure.inhg", "atmosphericPressure.hpa", "atmosphericPressure.inhg"]),
    (C::Voltage, ["voltage.v", "voltage.v", "voltage.v", "voltage.v"]),
    (C::Current, ["current.a", "current.a", "current.a", "current.a"]),
    (C::Power, ["power.w", "power.w", "power.w", "power.w"]),
    (C::Capacity, ["capacity.ah", "capacity.ah", "capacity.ah", "capacity.ah"]),
    (C::Volume, ["volume.l", "volume.galus", "volume.l", "volume.galus"]),
    (C::FlowRate, ["flowRate.lh", "flowRate.galush", "flowRate.lh", "flowRate.galush"]),
    (C::Rpm, ["rpm.rpm", "rpm.rpm", "rpm.rpm", "rpm.rpm"]),
    (C::RateOfTurn, ["rateOfTurn.degmin", "rateOfTurn.degmin", "rateOfTurn.degmin", "rateOfTurn.degmin"]),
    (C::Percentage, ["percentage.pct", "percentage.pct", "percentage.pct", "percentage.pct"]),
    (C::Humidity, ["humidity.pct", "humidity.pct", "humidity.pct", "humidity.pct"]),
    (C::Duration, ["duration.h", "duration.h", "duration.h", "duration.h"]),
    (C::Distance, ["distance.km", "distance.mi", "distance.nm", "distance.nm"]),
    (C::Latitude, ["latitude.dm", "latitude.dm", "latitude.dm", "latitude.dm"]),
    (C::Longitude, ["longitude.dm", "longitude.dm", "longitude.dm", "longitude.dm"]),
    (C::Count, ["count.n", "count.n", "count.n", "count.n"]),
    (C::DateTime, ["dateTime.utc", "dateTime.utc", "dateTime.utc", "dateTime.utc"]),
    (C::Text, ["text.plain", "text.plain", "text.plain", "text.plain"]),
];

fn region_index(region: UnitRegion) -> usize {
    match region {
        UnitRegion::Metric => 0,
        UnitRegion::Imperial => 1,
        UnitRegion::NauticalEu => 2,
        UnitRegion::NauticalUs => 3,
    }
}

fn slot(category: DataCategory, region: UnitRegion) -> usize {
    category as usize * UnitRegion::ALL.len() + region_index(region)
}

/// Lookup of presentations by category and region
///
/// Construct once at startup and share by reference.
#[derive(Debug, Clone)]
pub struct ConversionRegistry {
    by_id: HashMap<&'static str, Presentation>,
    /// Dense table indexed by [`slot`]; complete by construction
    defaults: Vec<Presentation>,
}

impl ConversionRegistry {
    /// Build the registry from the built-in tables
    pub fn new() -> Result<Self, ConversionError> {
        Self::from_tables(BUILTIN_PRESENTATIONS, BUILTIN_DEFAULTS)
    }

    /// Build and validate a registry from explicit tables
    pub fn from_tables(
        presentations: &[Presentation],
        defaults: &[(DataCategory, [&str; 4])],
    ) -> Result<Self, ConversionError> {
        let mut by_id = HashMap::new();
        for presentation in presentations {
            if !presentation.conversion.is_valid() {
                return Err(ConversionError::InvalidFactor(presentation.id.to_string()));
            }
            if by_id.insert(presentation.id, *presentation).is_some() {
                return Err(ConversionError::DuplicateId(presentation.id.to_string()));
            }
        }

        let mut table: Vec<Option<Presentation>> =
            vec![None; DataCategory::ALL.len() * UnitRegion::ALL.len()];
        for (category, ids) in defaults {
            for region in UnitRegion::ALL {
                let id = ids[region_index(region)];
                let presentation = by_id
                    .get(id)
                    .ok_or_else(|| ConversionError::UnknownPresentation(id.to_string()))?;
                if presentation.category != *category {
                    return Err(ConversionError::CategoryMismatch {
                        id: id.to_string(),
                        expected: *category,
                        found: presentation.category,
                    });
                }
                table[slot(*category, region)] = Some(*presentation);
            }
        }

        let mut complete = Vec::with_capacity(table.len());
        for category in DataCategory::ALL {
            for region in UnitRegion::ALL {
                match table[slot(category, region)] {
                    Some(presentation) => complete.push(presentation),
                    None => return Err(ConversionError::MissingMapping { category, region }),
                }
            }
        }

        log::debug!(
            "Conversion registry ready: {} presentations, {} region mappings",
            by_id.len(),
            complete.len()
        );
        Ok(Self {
            by_id,
            defaults: complete,
        })
    }

    /// Region default for a category
    pub fn get_presentation(&self, category: DataCategory, region: UnitRegion) -> &Presentation {
        &self.defaults[slot(category, region)]
    }

    /// Presentation for a category under the given user preferences
    ///
    /// A user override wins over the region default when it names a
    /// presentation of the same category.
    pub fn resolve(&self, category: DataCategory, config: &PresentationConfig) -> &Presentation {
        config
            .overrides
            .get(&category)
            .and_then(|id| self.by_id.get(id.as_str()))
            .filter(|p| p.category == category)
            .unwrap_or_else(|| self.get_presentation(category, config.region))
    }

    pub fn by_id(&self, id: &str) -> Option<&Presentation> {
        self.by_id.get(id)
    }

    /// All presentations a user may choose for a category, sorted by id
    pub fn options_for(&self, category: DataCategory) -> Vec<&Presentation> {
        let mut options: Vec<&Presentation> = self
            .by_id
            .values()
            .filter(|p| p.category == category)
            .collect();
        options.sort_by_key(|p| p.id);
        options
    }

    /// Check that every override in `config` names a presentation of its category
    pub fn validate_config(&self, config: &PresentationConfig) -> Result<(), ConversionError> {
        for (category, id) in &config.overrides {
            let presentation = self
                .by_id
                .get(id.as_str())
                .ok_or_else(|| ConversionError::UnknownPresentation(id.clone()))?;
            if presentation.category != *category {
                return Err(ConversionError::CategoryMismatch {
                    id: id.clone(),
                    expected: *category,
                    found: presentation.category,
                });
            }
        }
        Ok(())
    }
}
