//! Sensor schemas: the fields each sensor type carries
//!
//! A field's category decides how it is stored, enriched and whether it is
//! recorded in history. Fields that are not in a sensor's schema are ignored
//! on update.

use marine_sens_types::{
    DataCategory as C, FieldMetadata, SensorContext, SensorType, Thresholds,
};
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};

/// Field catalog for one sensor type
#[derive(Debug, Clone)]
pub struct SensorSchema {
    pub sensor_type: SensorType,
    pub fields: Vec<FieldMetadata>,
    /// Text field naming the reference datum of the sensor's readings.
    /// History is reset when it changes.
    pub source_field: Option<&'static str>,
}

impl SensorSchema {
    pub fn field(&self, key: &str) -> Option<&FieldMetadata> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn alarmable_fields(&self) -> impl Iterator<Item = &FieldMetadata> {
        self.fields.iter().filter(|f| f.alarmable)
    }
}

fn f(key: &'static str, label: &'static str, mnemonic: &'static str, category: C) -> FieldMetadata {
    FieldMetadata::new(key, label, mnemonic, category)
}

fn build(sensor_type: SensorType) -> SensorSchema {
    let (fields, source_field) = match sensor_type {
        SensorType::Depth => (
            vec![
                f("depth", "Depth", "DPT", C::Depth).with_thresholds(Thresholds::below(2.0, 3.0)),
                f("depthSource", "Depth source", "SRC", C::Text),
                f("offset", "Transducer offset", "OFS", C::Depth),
            ],
            Some("depthSource"),
        ),
        SensorType::Speed => (
            vec![
                f("throughWater", "Speed through water", "STW", C::Speed).alarmable(),
                f("overGround", "Speed over ground", "SOG", C::Speed).alarmable(),
                f("totalLog", "Total distance", "LOG", C::Distance),
                f("tripLog", "Trip distance", "TRIP", C::Distance),
            ],
            None,
        ),
        SensorType::Wind => (
            vec![
                f("apparentSpeed", "Apparent wind speed", "AWS", C::WindSpeed)
                    .with_thresholds(Thresholds::above(20.6, 15.4).disabled()),
                f("apparentDirection", "Apparent wind angle", "AWA", C::Angle),
                f("trueSpeed", "True wind speed", "TWS", C::WindSpeed)
                    .with_thresholds(Thresholds::above(20.6, 15.4).disabled()),
                f("trueDirection", "True wind direction", "TWD", C::Angle),
            ],
            None,
        ),
        SensorType::Gps => (
            vec![
                f("latitude", "Latitude", "LAT", C::Latitude),
                f("longitude", "Longitude", "LON", C::Longitude),
                f("altitude", "Altitude", "ALT", C::Distance),
                f("speedOverGround", "Speed over ground", "SOG", C::Speed),
                f("courseOverGround", "Course over ground", "COG", C::Angle),
                f("numberOfSatellites", "Satellites", "SATS", C::Count)
                    .with_thresholds(Thresholds::below(3.0, 5.0).disabled()),
                f("horizontalDilutionOfPrecision", "HDOP", "HDOP", C::Count),
                f("fixQuality", "Fix quality", "FIX", C::Count),
                f("positionMode", "Position mode", "MODE", C::Text),
                f("utcDateTime", "UTC date/time", "UTC", C::DateTime),
            ],
            None,
        ),
        SensorType::Compass => (
            vec![
                f("heading", "Heading", "HDG", C::Angle),
                f("magneticHeading", "Magnetic heading", "HDM", C::Angle),
                f("trueHeading", "True heading", "HDT", C::Angle),
                f("variation", "Magnetic variation", "VAR", C::Angle),
                f("deviation", "Deviation", "DEV", C::Angle),
                f("pitch", "Pitch", "PTCH", C::Angle).alarmable(),
                f("roll", "Roll", "ROLL", C::Angle).alarmable(),
                f("rateOfTurn", "Rate of turn", "ROT", C::RateOfTurn).alarmable(),
            ],
            None,
        ),
        SensorType::Engine => (
            vec![
                f("rpm", "Engine speed", "RPM", C::Rpm).alarmable(),
                f("coolantTemp", "Coolant temperature", "ECT", C::Temperature)
                    .with_thresholds(Thresholds::above(105.0, 95.0)),
                f("oilPressure", "Oil pressure", "EOP", C::Pressure)
                    .with_thresholds(Thresholds::below(100_000.0, 150_000.0)),
                f("oilTemperature", "Oil temperature", "EOT", C::Temperature).alarmable(),
                f("alternatorVoltage", "Alternator voltage", "ALT", C::Voltage).alarmable(),
                f("fuelRate", "Fuel rate", "FLOW", C::FlowRate),
                f("hours", "Engine hours", "EHR", C::Duration),
                f("shaftRpm", "Shaft speed", "SRPM", C::Rpm),
                f("boostPressure", "Boost pressure", "BST", C::Pressure).alarmable(),
            ],
            None,
        ),
        SensorType::Battery => (
            vec![
                f("voltage", "Voltage", "VLT", C::Voltage)
                    .with_thresholds(Thresholds::below(11.8, 12.2)),
                f("current", "Current", "AMP", C::Current).alarmable(),
                f("temperature", "Temperature", "TMP", C::Temperature)
                    .with_thresholds(Thresholds::above(50.0, 45.0)),
                f("stateOfCharge", "State of charge", "SOC", C::Percentage)
                    .with_thresholds(Thresholds::below(20.0, 40.0)),
                f("capacity", "Capacity", "CAP", C::Capacity),
                f("nominalVoltage", "Nominal voltage", "NOM", C::Voltage),
                f("timeRemaining", "Time remaining", "TTG", C::Duration).alarmable(),
                f("power", "Power", "PWR", C::Power),
            ],
            None,
        ),
        SensorType::Tank => (
            vec![
                f("level", "Level", "LVL", C::Percentage)
                    .with_thresholds(Thresholds::below(10.0, 25.0)),
                f("capacity", "Capacity", "CAP", C::Volume),
                f("volume", "Volume", "VOL", C::Volume),
            ],
            None,
        ),
        SensorType::Temperature => (
            vec![
                f("value", "Temperature", "VAL", C::Temperature).alarmable(),
                f("source", "Source", "SRC", C::Text),
            ],
            None,
        ),
        SensorType::Autopilot => (
            vec![
                f("mode", "Mode", "MODE", C::Text),
                f("state", "State", "STAT", C::Text),
                f("headingTarget", "Target heading", "TGT", C::Angle),
                f("rudderAngle", "Rudder angle", "RUD", C::Angle),
                f("offCourse", "Off course", "XTE", C::Angle)
                    .with_thresholds(Thresholds::above(20.0, 10.0).disabled()),
            ],
            None,
        ),
        SensorType::Navigation => (
            vec![
                f("crossTrackError", "Cross-track error", "XTE", C::Distance)
                    .with_thresholds(Thresholds::above(370.4, 185.2).disabled()),
                f("steerDirection", "Steer direction", "DIR", C::Text),
                f("bearingToWaypoint", "Bearing to waypoint", "BTW", C::Angle),
                f("distanceToWaypoint", "Distance to waypoint", "DTW", C::Distance),
                f("bearingOriginToDestination", "Bearing origin to destination", "BOD", C::Angle),
                f("waypointId", "Waypoint", "WPT", C::Text),
                f("velocityMadeGood", "Velocity made good", "VMG", C::Speed),
            ],
            None,
        ),
        SensorType::Weather => (
            vec![
                f("airTemperature", "Air temperature", "ATMP", C::Temperature).alarmable(),
                f("barometricPressure", "Barometric pressure", "BARO", C::AtmosphericPressure)
                    .alarmable(),
                f("humidity", "Humidity", "HUM", C::Humidity),
                f("dewPoint", "Dew point", "DEW", C::Temperature),
                f("waterTemperature", "Water temperature", "WTMP", C::Temperature),
                f("windSpeed", "Wind speed", "WSPD", C::WindSpeed),
                f("windDirection", "Wind direction", "WDIR", C::Angle),
            ],
            None,
        ),
        SensorType::Rudder => (
            vec![f("rudderAngle", "Rudder angle", "RUD", C::Angle).alarmable()],
            None,
        ),
    };
    SensorSchema {
        sensor_type,
        fields,
        source_field,
    }
}

static SCHEMAS: Lazy<HashMap<SensorType, SensorSchema>> = Lazy::new(|| {
    SensorType::ALL
        .iter()
        .map(|t| (*t, build(*t)))
        .collect()
});

/// Schema for a sensor type
pub fn schema(sensor_type: SensorType) -> &'static SensorSchema {
    // Every SensorType is inserted above
    &SCHEMAS[&sensor_type]
}

/// Metadata for one field of a sensor type
pub fn field(sensor_type: SensorType, key: &str) -> Option<&'static FieldMetadata> {
    schema(sensor_type).field(key)
}

/// Default thresholds for a sensor, taking its context into account
///
/// Tanks holding waste or black water alarm when filling up instead of
/// when running low.
pub fn default_thresholds(
    sensor_type: SensorType,
    context: Option<&SensorContext>,
) -> BTreeMap<String, Thresholds> {
    let mut thresholds: BTreeMap<String, Thresholds> = schema(sensor_type)
        .fields
        .iter()
        .filter_map(|f| f.default_thresholds.clone().map(|t| (f.key.to_string(), t)))
        .collect();

    if let Some(SensorContext::Tank(tank)) = context {
        if tank.fluid_type.alarms_when_full() {
            thresholds.insert("level".to_string(), Thresholds::above(90.0, 80.0));
        }
    }
    thresholds
}
