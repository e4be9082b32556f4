//! Configuration management

mod settings;
mod store;

pub use settings::{AlarmSettings, AppConfig, EnrichmentSettings};
pub use store::{read_records, FileConfigStore, SENSORS_FILE};
