//! Drives messages through decoding, the registry and the schedulers

use super::enrichment::{ReEnrichmentCoordinator, ReEnrichmentReport};
use super::sensor_registry::{HydrationReport, RegistryError, SensorRegistry};
use crate::decoders::MessageProcessor;
use log::{debug, error, info, trace};
use marine_sens_core::{Clock, ConfigProvider, ConversionError, PeriodicTask};
use marine_sens_types::{AlarmEvent, ParsedMessage, PresentationConfig, SensorSnapshot, SensorUpdate};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Result of feeding one message through the pipeline
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IngestOutcome {
    pub success: bool,
    /// Notifications for sensors whose metrics changed
    pub updates: Vec<SensorUpdate>,
    pub errors: Vec<String>,
}

/// Work done by one scheduler tick
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub alarms: Vec<AlarmEvent>,
    pub re_enrichment: Option<ReEnrichmentReport>,
    pub pruned: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PipelineStats {
    pub messages: u64,
    pub rejected: u64,
    pub sensor_updates: u64,
    pub alarm_events: u64,
    pub re_enrichments: u64,
    pub pruned_points: u64,
}

/// Input to a running pipeline
#[derive(Debug)]
pub enum PipelineCommand {
    Message(ParsedMessage),
    SetPresentation(PresentationConfig),
    /// Records read by the asynchronous configuration loader
    HydrationLoaded(HashMap<String, Value>),
    /// Reply with a snapshot of every sensor
    Snapshot(oneshot::Sender<Vec<SensorSnapshot>>),
    Shutdown,
}

pub struct TelemetryPipeline<P: ConfigProvider> {
    processor: MessageProcessor,
    registry: SensorRegistry<P>,
    coordinator: ReEnrichmentCoordinator,
    clock: Box<dyn Clock + Send>,
    maintenance: PeriodicTask,
    stats: PipelineStats,
}

impl<P: ConfigProvider> TelemetryPipeline<P> {
    pub fn new(
        processor: MessageProcessor,
        registry: SensorRegistry<P>,
        enrichment_debounce_ms: u64,
        clock: Box<dyn Clock + Send>,
    ) -> Self {
        let coordinator = ReEnrichmentCoordinator::new(
            registry.conversions().clone(),
            registry.presentation().clone(),
            enrichment_debounce_ms,
        );
        let maintenance = PeriodicTask::new(registry.config().history.prune_interval_ms);
        Self {
            processor,
            registry,
            coordinator,
            clock,
            maintenance,
            stats: PipelineStats::default(),
        }
    }

    pub fn registry(&self) -> &SensorRegistry<P> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SensorRegistry<P> {
        &mut self.registry
    }

    pub fn processor(&self) -> &MessageProcessor {
        &self.processor
    }

    pub fn coordinator(&self) -> &ReEnrichmentCoordinator {
        &self.coordinator
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Decode a message and apply its updates in arrival order
    pub fn ingest(&mut self, msg: &ParsedMessage) -> IngestOutcome {
        self.stats.messages += 1;
        let result = self.processor.process(msg);
        if !result.success {
            self.stats.rejected += 1;
            return IngestOutcome {
                success: false,
                updates: Vec::new(),
                errors: result.errors,
            };
        }

        let now = self.clock.now_ms();
        let updates: Vec<SensorUpdate> = result
            .updates
            .iter()
            .filter_map(|u| self.registry.update(u.sensor_type, u.instance, &u.data, now))
            .collect();
        self.stats.sensor_updates += updates.len() as u64;
        IngestOutcome {
            success: true,
            updates,
            errors: result.errors,
        }
    }

    /// Queue a presentation change for the next batch pass
    pub fn request_presentation(&mut self, config: PresentationConfig) -> Result<(), ConversionError> {
        let now = self.clock.now_ms();
        self.coordinator.request_change(config, now)
    }

    /// Hand loaded configuration records to the store and merge them
    pub fn complete_hydration(
        &mut self,
        records: HashMap<String, Value>,
    ) -> Result<HydrationReport, RegistryError> {
        self.registry.provider_mut().finish_loading(records);
        let now = self.clock.now_ms();
        self.registry.complete_hydration(now)
    }

    /// Run whatever scheduled work is due
    pub fn tick(&mut self) -> TickReport {
        let now = self.clock.now_ms();
        let mut report = TickReport {
            re_enrichment: self.coordinator.poll(now, &mut self.registry),
            ..Default::default()
        };
        report.alarms = self.registry.poll_alarms(now);
        if self.maintenance.poll(now) {
            report.pruned = self.registry.prune_history(now);
            report.alarms.extend(self.registry.check_staleness(now));
        }
        self.record(&report);
        report
    }

    /// Run all pending work now, regardless of debounce windows
    pub fn flush(&mut self) -> TickReport {
        let now = self.clock.now_ms();
        let mut report = TickReport {
            re_enrichment: self.coordinator.flush(&mut self.registry),
            ..Default::default()
        };
        report.alarms = self.registry.flush_alarms(now);
        self.record(&report);
        report
    }

    fn record(&mut self, report: &TickReport) {
        self.stats.alarm_events += report.alarms.len() as u64;
        self.stats.pruned_points += report.pruned as u64;
        if report.re_enrichment.is_some() {
            self.stats.re_enrichments += 1;
        }
    }

    /// Process commands until `Shutdown` or the sender goes away
    ///
    /// Scheduled work runs every `tick_interval`. Pending work is flushed
    /// before returning.
    pub async fn run(mut self, mut commands: mpsc::Receiver<PipelineCommand>, tick_interval: Duration) -> Self {
        let mut interval = tokio::time::interval(tick_interval);
        info!("Telemetry pipeline started (tick {:?})", tick_interval);

        loop {
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(PipelineCommand::Message(msg)) => {
                            let outcome = self.ingest(&msg);
                            if !outcome.success {
                                trace!("{} rejected: {}", msg.message_type, outcome.errors.join("; "));
                            }
                        }
                        Some(PipelineCommand::SetPresentation(config)) => {
                            if let Err(e) = self.request_presentation(config) {
                                error!("Presentation change rejected: {}", e);
                            }
                        }
                        Some(PipelineCommand::HydrationLoaded(records)) => {
                            if let Err(e) = self.complete_hydration(records) {
                                error!("Failed to complete configuration hydration: {}", e);
                            }
                        }
                        Some(PipelineCommand::Snapshot(reply)) => {
                            if reply.send(self.registry.snapshot()).is_err() {
                                debug!("Snapshot requester went away");
                            }
                        }
                        Some(PipelineCommand::Shutdown) | None => break,
                    }
                }
                _ = interval.tick() => {
                    let report = self.tick();
                    if !report.alarms.is_empty() || report.pruned > 0 {
                        debug!("Tick: {} alarm events, {} points pruned", report.alarms.len(), report.pruned);
                    }
                }
            }
        }

        self.flush();
        info!(
            "Telemetry pipeline stopped after {} messages ({} rejected)",
            self.stats.messages, self.stats.rejected
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sensor_registry::RegistryConfig;
    use crate::decoders::TalkerTable;
    use marine_sens_core::{ConversionRegistry, ManualClock, MemoryConfigStore};
    use marine_sens_types::{AlarmLevel, SensorKey, SensorType, UnitRegion};
    use std::sync::Arc;

    fn pipeline(clock: &ManualClock) -> TelemetryPipeline<MemoryConfigStore> {
        let registry = SensorRegistry::new(
            MemoryConfigStore::new(),
            Arc::new(ConversionRegistry::new().unwrap()),
            PresentationConfig::default(),
            RegistryConfig::default(),
        );
        TelemetryPipeline::new(
            MessageProcessor::new(TalkerTable::default()),
            registry,
            50,
            Box::new(clock.clone()),
        )
    }

    fn dpt(depth: f64) -> ParsedMessage {
        ParsedMessage::new("SDDPT", 0)
            .with("depth", depth)
            .with("offset", 0.5)
    }

    #[test]
    fn test_ingest_and_alarm_tick() {
        let clock = ManualClock::new(0);
        let mut pipeline = pipeline(&clock);
        let outcome = pipeline.ingest(&dpt(1.5));
        assert!(outcome.success);
        assert_eq!(outcome.updates.len(), 1);

        clock.advance(100);
        assert!(pipeline.tick().alarms.is_empty());
        clock.advance(200);
        let report = pipeline.tick();
        assert_eq!(report.alarms.len(), 1);
        assert_eq!(report.alarms[0].level, AlarmLevel::Critical);
        assert_eq!(pipeline.stats().alarm_events, 1);
    }

    #[test]
    fn test_rejected_message_changes_nothing() {
        let clock = ManualClock::new(0);
        let mut pipeline = pipeline(&clock);
        let outcome = pipeline.ingest(&dpt(f64::NAN));
        assert!(!outcome.success);
        assert!(!outcome.errors.is_empty());
        assert!(pipeline.registry().is_empty());
        assert_eq!(pipeline.stats().rejected, 1);
    }

    #[test]
    fn test_presentation_change_batches() {
        let clock = ManualClock::new(0);
        let mut pipeline = pipeline(&clock);
        pipeline.ingest(&dpt(3.048));
        pipeline
            .request_presentation(PresentationConfig::for_region(UnitRegion::Imperial))
            .unwrap();
        let key = SensorKey::new(SensorType::Depth, 0);
        assert_eq!(pipeline.registry().get_metric(&key, "depth").unwrap().unit(), "m");

        clock.advance(60);
        let report = pipeline.tick();
        assert_eq!(report.re_enrichment.map(|r| r.instances), Some(1));
        assert_eq!(pipeline.registry().get_metric(&key, "depth").unwrap().unit(), "ft");
    }

    #[test]
    fn test_hydration_through_pipeline() {
        let clock = ManualClock::new(0);
        let registry = SensorRegistry::new(
            MemoryConfigStore::pending(),
            Arc::new(ConversionRegistry::new().unwrap()),
            PresentationConfig::default(),
            RegistryConfig::default(),
        );
        let mut pipeline = TelemetryPipeline::new(
            MessageProcessor::new(TalkerTable::default()),
            registry,
            50,
            Box::new(clock.clone()),
        );
        pipeline.ingest(&dpt(4.0));
        let mut records = HashMap::new();
        records.insert(
            "depth.0".to_string(),
            serde_json::json!({
                "metrics": {
                    "depth": {
                        "critical": {"min": 5.0},
                        "warning": {"min": 6.0},
                        "direction": "below"
                    }
                }
            }),
        );
        let report = pipeline.complete_hydration(records).unwrap();
        assert_eq!(report.applied, 1);
        let events = pipeline.flush().alarms;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, AlarmLevel::Critical);
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let clock = ManualClock::new(0);
        let pipeline = pipeline(&clock);
        let (tx, rx) = mpsc::channel(16);
        tx.send(PipelineCommand::Message(dpt(12.0))).await.unwrap();
        tx.send(PipelineCommand::Message(ParsedMessage::new("XXFOO", 0)))
            .await
            .unwrap();
        let (reply, snapshot) = oneshot::channel();
        tx.send(PipelineCommand::Snapshot(reply)).await.unwrap();
        tx.send(PipelineCommand::Shutdown).await.unwrap();
        let pipeline = pipeline.run(rx, Duration::from_millis(10)).await;
        assert_eq!(snapshot.await.unwrap().len(), 1);
        assert_eq!(pipeline.stats().messages, 2);
        assert_eq!(pipeline.stats().rejected, 1);
        assert_eq!(pipeline.registry().len(), 1);
        assert_eq!(pipeline.processor().diagnostics().total(), 1);
    }
}
