//! NMEA 0183 sentence decoders
//!
//! Field names follow the upstream sentence parser: one key per sentence
//! field, numbers as numbers or numeric strings, empty strings for empty
//! fields.

mod depth;
mod environment;
mod gps;
mod heading;
mod motion;
mod navigation;
mod propulsion;
mod transducer;
mod wind;

use super::validation::{FieldReader, Range, ValidationError};
use super::MessageProcessor;
use chrono::{NaiveDate, NaiveTime};

pub fn register_all(processor: &mut MessageProcessor) {
    processor.register_sentence("DPT", depth::decode_dpt);
    processor.register_sentence("DBT", depth::decode_dbt);
    processor.register_sentence("DBK", depth::decode_dbt);
    processor.register_sentence("DBS", depth::decode_dbt);

    processor.register_sentence("VHW", motion::decode_vhw);
    processor.register_sentence("VLW", motion::decode_vlw);
    processor.register_sentence("VTG", motion::decode_vtg);

    processor.register_sentence("RMC", gps::decode_rmc);
    processor.register_sentence("GGA", gps::decode_gga);
    processor.register_sentence("GLL", gps::decode_gll);
    processor.register_sentence("ZDA", gps::decode_zda);

    processor.register_sentence("HDG", heading::decode_hdg);
    processor.register_sentence("HDM", heading::decode_hdm);
    processor.register_sentence("HDT", heading::decode_hdt);
    processor.register_sentence("ROT", heading::decode_rot);

    processor.register_sentence("MWV", wind::decode_mwv);
    processor.register_sentence("MWD", wind::decode_mwd);
    processor.register_sentence("VWR", wind::decode_vwr);

    processor.register_sentence("MTW", environment::decode_mtw);
    processor.register_sentence("MDA", environment::decode_mda);
    processor.register_sentence("MMB", environment::decode_mmb);
    processor.register_sentence("MTA", environment::decode_mta);

    processor.register_sentence("XDR", transducer::decode_xdr);

    processor.register_sentence("RPM", propulsion::decode_rpm);
    processor.register_sentence("RSA", propulsion::decode_rsa);

    processor.register_sentence("APB", navigation::decode_apb);
    processor.register_sentence("XTE", navigation::decode_xte);
    processor.register_sentence("RMB", navigation::decode_rmb);
    processor.register_sentence("BWC", navigation::decode_bwc);
}

/// `hhmmss.ss` as seconds since midnight
fn time_of_day(reader: &mut FieldReader<'_>, key: &str) -> Option<NaiveTime> {
    let raw = reader.opt_number(key, Range::new(0.0, 235_960.0))?;
    let hours = (raw / 10_000.0).trunc() as u32;
    let minutes = ((raw / 100.0).trunc() as u32) % 100;
    let seconds = raw % 100.0;
    let whole = seconds.trunc() as u32;
    let nanos = ((seconds - seconds.trunc()) * 1e9).round() as u32;
    let time = NaiveTime::from_hms_nano_opt(hours, minutes, whole.min(59), nanos.min(999_999_999));
    if time.is_none() {
        reader.reject(ValidationError::InvalidValue {
            field: key.to_string(),
            value: format!("{}", raw),
        });
    }
    time
}

/// `ddmmyy` date
fn date_ddmmyy(reader: &mut FieldReader<'_>, key: &str) -> Option<NaiveDate> {
    let raw = reader.opt_number(key, Range::new(10_100.0, 311_299.0))? as u32;
    let day = raw / 10_000;
    let month = (raw / 100) % 100;
    let yy = (raw % 100) as i32;
    let year = if yy < 80 { 2000 + yy } else { 1900 + yy };
    let date = NaiveDate::from_ymd_opt(year, month, day);
    if date.is_none() {
        reader.reject(ValidationError::InvalidValue {
            field: key.to_string(),
            value: format!("{:06}", raw),
        });
    }
    date
}

/// Epoch milliseconds of a UTC date and time
fn epoch_millis(date: NaiveDate, time: NaiveTime) -> f64 {
    date.and_time(time).and_utc().timestamp_millis() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use marine_sens_types::ParsedMessage;

    #[test]
    fn test_time_and_date_fields() {
        let msg = ParsedMessage::new("GPRMC", 0)
            .with("time", "123519.50")
            .with("date", 230394.0);
        let mut reader = FieldReader::new(&msg);
        let time = time_of_day(&mut reader, "time").unwrap();
        let date = date_ddmmyy(&mut reader, "date").unwrap();
        assert_eq!(time.format("%H:%M:%S%.3f").to_string(), "12:35:19.500");
        assert_eq!(date, NaiveDate::from_ymd_opt(1994, 3, 23).unwrap());
        assert_eq!(epoch_millis(date, time), 764_426_119_500.0);
    }

    #[test]
    fn test_leading_zero_time_as_number() {
        let msg = ParsedMessage::new("GPZDA", 0).with("time", 5_007.0);
        let mut reader = FieldReader::new(&msg);
        let time = time_of_day(&mut reader, "time").unwrap();
        assert_eq!(time.format("%H:%M:%S").to_string(), "00:50:07");
    }

    #[test]
    fn test_impossible_date_rejected() {
        let msg = ParsedMessage::new("GPRMC", 0).with("date", 310224.0);
        let mut reader = FieldReader::new(&msg);
        assert!(date_ddmmyy(&mut reader, "date").is_none());
        assert!(!reader.is_ok());
    }
}
