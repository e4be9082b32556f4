//! marine-sens-types: Shared data types for the marine-sens telemetry pipeline.
//!
//! This crate contains the plain, serializable data model (sensor identity,
//! categories, thresholds, contexts, messages and snapshots) shared by every
//! marine-sens crate. It has no runtime behavior beyond validation.

pub mod alarm;
pub mod category;
pub mod context;
pub mod error;
pub mod field;
pub mod message;
pub mod presentation;
pub mod sensor;
pub mod snapshot;
pub mod threshold;

// Re-export commonly used types at the crate root for convenience
pub use alarm::{AlarmEvent, AlarmLevel};
pub use category::{DataCategory, UnitRegion};
pub use context::{
    BatteryChemistry, BatteryContext, DepthContext, DepthReference, EngineContext, EngineType,
    FluidType, SensorContext, TankContext, TemperatureContext, TemperatureLocation,
};
pub use error::{ConfigValidationError, SerializationError};
pub use field::{FieldMetadata, FieldValue};
pub use message::{FieldUpdate, ParsedMessage, SensorData, SensorUpdate};
pub use presentation::{HistoryPoint, PresentationConfig};
pub use sensor::{SensorKey, SensorType};
pub use snapshot::{SensorConfiguration, SensorSnapshot, SnapshotMetric};
pub use threshold::{Limits, ThresholdDirection, Thresholds};
