//! Data categories and unit regions
//!
//! A category names the physical quantity a metric measures. Every category
//! has exactly one canonical (SI-style) unit in which values are stored; the
//! unit a user sees is chosen per region by the conversion registry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical quantity carried by a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataCategory {
    /// Water depth, metres
    Depth,
    /// Vessel speed, metres per second
    Speed,
    /// Wind speed, metres per second
    WindSpeed,
    /// Direction or angle, degrees
    Angle,
    /// Temperature, degrees Celsius
    Temperature,
    /// Fluid or engine pressure, pascals
    Pressure,
    /// Barometric pressure, pascals
    AtmosphericPressure,
    /// Electric potential, volts
    Voltage,
    /// Electric current, amperes
    Current,
    /// Electric power, watts
    Power,
    /// Battery capacity, ampere-hours
    Capacity,
    /// Fluid volume, litres
    Volume,
    /// Fuel flow, litres per hour
    FlowRate,
    /// Rotational speed, revolutions per minute
    Rpm,
    /// Rate of turn, degrees per minute
    RateOfTurn,
    /// Ratio, percent
    Percentage,
    /// Relative humidity, percent
    Humidity,
    /// Elapsed time, hours
    Duration,
    /// Distance, metres
    Distance,
    /// Latitude, decimal degrees
    Latitude,
    /// Longitude, decimal degrees
    Longitude,
    /// Plain count (satellites, dilution of precision)
    Count,
    /// Point in time, epoch milliseconds
    DateTime,
    /// Free text (identifiers, modes)
    Text,
}

impl DataCategory {
    pub const ALL: [DataCategory; 24] = [
        DataCategory::Depth,
        DataCategory::Speed,
        DataCategory::WindSpeed,
        DataCategory::Angle,
        DataCategory::Temperature,
        DataCategory::Pressure,
        DataCategory::AtmosphericPressure,
        DataCategory::Voltage,
        DataCategory::Current,
        DataCategory::Power,
        DataCategory::Capacity,
        DataCategory::Volume,
        DataCategory::FlowRate,
        DataCategory::Rpm,
        DataCategory::RateOfTurn,
        DataCategory::Percentage,
        DataCategory::Humidity,
        DataCategory::Duration,
        DataCategory::Distance,
        DataCategory::Latitude,
        DataCategory::Longitude,
        DataCategory::Count,
        DataCategory::DateTime,
        DataCategory::Text,
    ];

    /// Unit symbol of the stored canonical value
    pub fn canonical_unit(&self) -> &'static str {
        match self {
            DataCategory::Depth | DataCategory::Distance => "m",
            DataCategory::Speed | DataCategory::WindSpeed => "m/s",
            DataCategory::Angle | DataCategory::Latitude | DataCategory::Longitude => "°",
            DataCategory::Temperature => "°C",
            DataCategory::Pressure | DataCategory::AtmosphericPressure => "Pa",
            DataCategory::Voltage => "V",
            DataCategory::Current => "A",
            DataCategory::Power => "W",
            DataCategory::Capacity => "Ah",
            DataCategory::Volume => "L",
            DataCategory::FlowRate => "L/h",
            DataCategory::Rpm => "rpm",
            DataCategory::RateOfTurn => "°/min",
            DataCategory::Percentage | DataCategory::Humidity => "%",
            DataCategory::Duration => "h",
            DataCategory::Count | DataCategory::DateTime | DataCategory::Text => "",
        }
    }

    /// Whether values carry a number
    pub fn is_numeric(&self) -> bool {
        !matches!(self, DataCategory::Text)
    }

    /// Whether values of this category are recorded in history
    ///
    /// Timestamps and text are numeric-or-not but meaningless to trend.
    pub fn is_historized(&self) -> bool {
        !matches!(self, DataCategory::Text | DataCategory::DateTime)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataCategory::Depth => "depth",
            DataCategory::Speed => "speed",
            DataCategory::WindSpeed => "windSpeed",
            DataCategory::Angle => "angle",
            DataCategory::Temperature => "temperature",
            DataCategory::Pressure => "pressure",
            DataCategory::AtmosphericPressure => "atmosphericPressure",
            DataCategory::Voltage => "voltage",
            DataCategory::Current => "current",
            DataCategory::Power => "power",
            DataCategory::Capacity => "capacity",
            DataCategory::Volume => "volume",
            DataCategory::FlowRate => "flowRate",
            DataCategory::Rpm => "rpm",
            DataCategory::RateOfTurn => "rateOfTurn",
            DataCategory::Percentage => "percentage",
            DataCategory::Humidity => "humidity",
            DataCategory::Duration => "duration",
            DataCategory::Distance => "distance",
            DataCategory::Latitude => "latitude",
            DataCategory::Longitude => "longitude",
            DataCategory::Count => "count",
            DataCategory::DateTime => "dateTime",
            DataCategory::Text => "text",
        }
    }
}

impl fmt::Display for DataCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Regional unit convention selected by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnitRegion {
    /// SI-leaning units: metres, km/h, °C, hPa
    Metric,
    /// US customary: feet, mph, °F, inHg
    Imperial,
    /// European boating: metres, knots, °C, hPa
    #[default]
    NauticalEu,
    /// US boating: feet, knots, °F, inHg
    NauticalUs,
}

impl UnitRegion {
    pub const ALL: [UnitRegion; 4] = [
        UnitRegion::Metric,
        UnitRegion::Imperial,
        UnitRegion::NauticalEu,
        UnitRegion::NauticalUs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitRegion::Metric => "metric",
            UnitRegion::Imperial => "imperial",
            UnitRegion::NauticalEu => "nauticalEu",
            UnitRegion::NauticalUs => "nauticalUs",
        }
    }
}

impl fmt::Display for UnitRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UnitRegion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s.chars().filter(|c| *c != '-' && *c != '_').collect();
        UnitRegion::ALL
            .iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(&normalized))
            .copied()
            .ok_or_else(|| format!("Unknown unit region: {}", s))
    }
}
