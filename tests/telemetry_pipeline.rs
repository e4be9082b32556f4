//! End-to-end: messages in, enriched sensors, hydration and alarms out

use marine_sens::core::{RegistryConfig, RegistryEvent, SensorRegistry, TelemetryPipeline};
use marine_sens::decoders::{MessageProcessor, TalkerTable};
use marine_sens_core::{ConfigProvider, ConversionRegistry, ManualClock, MemoryConfigStore};
use marine_sens_types::{
    AlarmLevel, ParsedMessage, PresentationConfig, SensorKey, SensorType, UnitRegion,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

fn pipeline(clock: &ManualClock, store: MemoryConfigStore) -> TelemetryPipeline<MemoryConfigStore> {
    let registry = SensorRegistry::new(
        store,
        Arc::new(ConversionRegistry::new().unwrap()),
        PresentationConfig::for_region(UnitRegion::Metric),
        RegistryConfig::default(),
    );
    TelemetryPipeline::new(
        MessageProcessor::new(TalkerTable::default().with("S2", 1)),
        registry,
        50,
        Box::new(clock.clone()),
    )
}

fn depth(value: f64) -> ParsedMessage {
    ParsedMessage::new("SDDPT", 0).with("depth", value)
}

fn battery(voltage: f64) -> ParsedMessage {
    ParsedMessage::new("PGN127508", 0)
        .with("instance", 0.0)
        .with("voltage", voltage)
}

#[test]
fn test_hydration_race_keeps_persisted_thresholds() {
    let clock = ManualClock::new(0);
    let mut pipeline = pipeline(&clock, MemoryConfigStore::pending());
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    pipeline
        .registry_mut()
        .on_event(move |event| sink.lock().unwrap().push(event.clone()));

    // data arrives before the store has loaded
    assert!(pipeline.ingest(&depth(3.5)).success);
    assert!(pipeline.ingest(&battery(12.6)).success);
    let battery_key = SensorKey::new(SensorType::Battery, 0);
    pipeline.registry_mut().rename(&battery_key, "House bank").unwrap();

    let mut records = HashMap::new();
    records.insert(
        "depth.0".to_string(),
        json!({"metrics": {"depth": {
            "critical": {"min": 4.0},
            "warning": {"min": 5.0},
            "direction": "below"
        }}}),
    );
    records.insert("battery.0".to_string(), json!({"name": "Port bank"}));
    let report = pipeline.complete_hydration(records).unwrap();
    assert_eq!(report.applied, 1);
    assert_eq!(report.preserved_edits, 1);

    let depth_key = SensorKey::new(SensorType::Depth, 0);
    let registry = pipeline.registry();
    assert_eq!(registry.get(&depth_key).unwrap().metrics()["depth"].as_f64(), Some(3.5));
    assert_eq!(registry.get(&battery_key).unwrap().name(), "House bank");
    assert_eq!(
        registry.provider().load(&battery_key).unwrap().and_then(|c| c.name),
        Some("House bank".to_string())
    );

    clock.advance(300);
    let report = pipeline.tick();
    let depth_alarm = report
        .alarms
        .iter()
        .find(|a| a.sensor_type == SensorType::Depth && a.metric_key == "depth")
        .expect("depth alarm");
    assert_eq!(depth_alarm.level, AlarmLevel::Critical);

    let events = events.lock().unwrap();
    let created = events
        .iter()
        .filter(|e| matches!(e, RegistryEvent::Created(_)))
        .count();
    assert_eq!(created, 2);
    assert!(events.iter().any(|e| matches!(e, RegistryEvent::Alarm(_))));
}

#[test]
fn test_presentation_change_and_statistics() {
    let clock = ManualClock::new(0);
    let mut pipeline = pipeline(&clock, MemoryConfigStore::new());
    pipeline
        .registry_mut()
        .subscribe_history(SensorType::Depth, "depth", "chart", 60_000);

    for (i, value) in [10.0, 12.0, 14.0].into_iter().enumerate() {
        clock.set(i as i64 * 1000);
        pipeline.ingest(&depth(value));
    }
    let key = SensorKey::new(SensorType::Depth, 0);
    let sensor = pipeline.registry().get(&key).unwrap();
    assert_eq!(sensor.history("depth").unwrap().len(), 3);

    let max = pipeline.registry().get_metric(&key, "depth.max").unwrap();
    assert_eq!(max.as_f64(), Some(14.0));
    assert_eq!(max.unit(), "m");

    pipeline
        .request_presentation(PresentationConfig::for_region(UnitRegion::Imperial))
        .unwrap();
    clock.advance(60);
    let report = pipeline.tick();
    assert_eq!(report.re_enrichment.map(|r| r.instances), Some(1));
    let live = pipeline.registry().get_metric(&key, "depth").unwrap();
    let max = pipeline.registry().get_metric(&key, "depth.max").unwrap();
    assert_eq!(live.unit(), "ft");
    assert_eq!(max.unit(), live.unit());
}

#[test]
fn test_talker_instances_and_staleness() {
    let clock = ManualClock::new(0);
    let mut pipeline = pipeline(&clock, MemoryConfigStore::new());
    pipeline.ingest(&depth(20.0));
    pipeline.ingest(&ParsedMessage::new("S2DPT", 0).with("depth", 25.0));
    assert_eq!(pipeline.registry().len(), 2);
    assert!(pipeline
        .registry()
        .get(&SensorKey::new(SensorType::Depth, 1))
        .is_some());

    clock.advance(300);
    assert!(pipeline.tick().alarms.is_empty());

    clock.advance(15_000);
    let report = pipeline.tick();
    assert!(report
        .alarms
        .iter()
        .any(|a| a.metric_key == "depth" && a.level == AlarmLevel::Stale));

    // fresh data clears stale
    pipeline.ingest(&depth(20.0));
    clock.advance(300);
    let report = pipeline.tick();
    assert!(report
        .alarms
        .iter()
        .any(|a| a.instance == 0 && a.metric_key == "depth" && a.level == AlarmLevel::Normal));
}

#[test]
fn test_unsupported_and_invalid_messages_leave_no_trace() {
    let clock = ManualClock::new(0);
    let mut pipeline = pipeline(&clock, MemoryConfigStore::new());
    assert!(!pipeline.ingest(&ParsedMessage::new("GPXYZ", 5)).success);
    assert!(!pipeline.ingest(&depth(-4.0)).success);
    assert!(pipeline.registry().is_empty());
    assert_eq!(pipeline.processor().diagnostics().count_for("GPXYZ"), 1);
    assert_eq!(pipeline.stats().rejected, 2);
}
