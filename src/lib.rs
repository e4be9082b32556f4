//! marine-sens: NMEA 0183 / NMEA 2000 sensor telemetry pipeline
//!
//! This library turns parsed marine messages into live, enriched sensor
//! state:
//! - Decoders for NMEA 0183 sentences and NMEA 2000 PGNs
//! - Sensor instances with unit-aware metric values, history and alarms
//! - A registry that merges persisted sensor configuration safely
//! - Configuration management and a runtime driver

pub mod config;
pub mod core;
pub mod decoders;
pub mod demo;

// Re-export commonly used types
pub use config::{AppConfig, FileConfigStore};
pub use core::{MetricValue, SensorInstance, SensorRegistry, TelemetryPipeline};
pub use decoders::{MessageProcessor, ProcessResult};
