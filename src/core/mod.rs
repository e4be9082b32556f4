//! Sensor state: schemas, metric values, history, alarms and the registry

mod alarm;
mod enrichment;
mod history;
mod metric_value;
mod pipeline;
pub mod schema;
mod sensor_instance;
mod sensor_registry;

pub use alarm::AlarmEvaluator;
pub use enrichment::{EnrichmentTarget, ReEnrichmentCoordinator, ReEnrichmentReport};
pub use history::{AdaptiveHistoryBuffer, AppendOutcome, HistoryConfig, HistoryStats, PruneOutcome};
pub use metric_value::{DisplayFields, MetricValue};
pub use pipeline::{IngestOutcome, PipelineCommand, PipelineStats, TelemetryPipeline, TickReport};
pub use schema::SensorSchema;
pub use sensor_instance::{AlarmChange, EnrichContext, SensorInstance};
pub use sensor_registry::{
    HydrationReport, RegistryConfig, RegistryError, RegistryEvent, SensorRegistry,
};
