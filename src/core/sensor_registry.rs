//! Keyed store of live sensor instances
//!
//! Instances are created lazily on first data. Persisted configuration is
//! merged in at creation, or, while the configuration store is still
//! loading, exactly once when loading completes.

use super::enrichment::EnrichmentTarget;
use super::history::HistoryConfig;
use super::sensor_instance::{EnrichContext, SensorInstance};
use super::metric_value::MetricValue;
use log::{debug, info, trace, warn};
use marine_sens_core::constants::{
    DEFAULT_ALARM_MAX_LATENCY_MS, DEFAULT_ALARM_QUIET_MS, DEFAULT_STALE_AFTER_MS,
};
use marine_sens_core::{ConfigProvider, ConfigStoreError, ConversionRegistry, Debouncer};
use marine_sens_types::{
    AlarmEvent, ConfigValidationError, PresentationConfig, SensorConfiguration, SensorContext,
    SensorData, SensorKey, SensorSnapshot, SensorType, SensorUpdate, SerializationError, Thresholds,
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown sensor {0}")]
    UnknownSensor(SensorKey),

    #[error(transparent)]
    Config(#[from] ConfigValidationError),

    #[error(transparent)]
    Store(#[from] ConfigStoreError),
}

/// Timing and retention settings for the registry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistryConfig {
    pub alarm_quiet_ms: u64,
    pub alarm_max_latency_ms: u64,
    pub stale_after_ms: u64,
    pub history: HistoryConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            alarm_quiet_ms: DEFAULT_ALARM_QUIET_MS,
            alarm_max_latency_ms: DEFAULT_ALARM_MAX_LATENCY_MS,
            stale_after_ms: DEFAULT_STALE_AFTER_MS,
            history: HistoryConfig::default(),
        }
    }
}

/// Notification sent to registry listeners
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryEvent {
    /// First data for a sensor; sent once per instance
    Created(SensorKey),
    Updated(SensorUpdate),
    Alarm(AlarmEvent),
    Removed(SensorKey),
}

/// Outcome of merging persisted configuration after loading completed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HydrationReport {
    /// Instances that received their persisted configuration
    pub applied: usize,
    /// Instances without a persisted record, keeping schema defaults
    pub defaults: usize,
    /// Instances edited by the user while loading; their edits were merged
    /// over the persisted record and saved
    pub preserved_edits: usize,
    /// Instances whose record could not be read
    pub skipped: usize,
}

enum Hydration {
    /// Store still loading; instances created so far await reconciliation
    Pending {
        queued: BTreeSet<SensorKey>,
        edits: BTreeMap<SensorKey, PendingEdits>,
        /// Removed while loading; their records are dropped on hydration
        removed: BTreeSet<SensorKey>,
        /// Factory reset while loading
        cleared: bool,
    },
    Complete,
}

impl Hydration {
    fn pending() -> Self {
        Hydration::Pending {
            queued: BTreeSet::new(),
            edits: BTreeMap::new(),
            removed: BTreeSet::new(),
            cleared: false,
        }
    }
}

/// Parts of one sensor's configuration the user changed while loading
#[derive(Debug, Default)]
struct PendingEdits {
    name: bool,
    context: bool,
    thresholds: BTreeSet<String>,
    enabled: BTreeMap<String, bool>,
}

enum Edit<'a> {
    Name,
    Context,
    Thresholds(&'a str),
    Enabled(&'a str, bool),
}

impl PendingEdits {
    fn record(&mut self, edit: Edit<'_>) {
        match edit {
            Edit::Name => self.name = true,
            Edit::Context => self.context = true,
            Edit::Thresholds(key) => {
                // New thresholds carry their own enabled flag
                self.enabled.remove(key);
                self.thresholds.insert(key.to_string());
            }
            Edit::Enabled(key, enabled) => {
                self.enabled.insert(key.to_string(), enabled);
            }
        }
    }

    /// Stored configuration with the edited parts of `live` laid over it
    fn overlay(&self, stored: Option<SensorConfiguration>, live: &SensorInstance) -> SensorConfiguration {
        let mut merged = stored.unwrap_or_default();
        if self.name {
            merged.name = Some(live.name().to_string());
        }
        if self.context {
            merged.context = live.context().cloned();
        }
        for key in &self.thresholds {
            if let Some(thresholds) = live.thresholds_for(key) {
                merged.metrics.insert(key.clone(), thresholds.clone());
            }
        }
        merged
    }
}

type Listener = Box<dyn FnMut(&RegistryEvent) + Send>;

pub struct SensorRegistry<P: ConfigProvider> {
    instances: BTreeMap<SensorKey, SensorInstance>,
    provider: P,
    conversions: Arc<ConversionRegistry>,
    presentation: PresentationConfig,
    hydration: Hydration,
    alarm_debouncer: Debouncer,
    pending_alarm_keys: BTreeMap<SensorKey, BTreeSet<String>>,
    /// Active history subscriptions: (type, metric) -> consumer -> window
    subscriptions: BTreeMap<(SensorType, String), HashMap<String, u64>>,
    listeners: Vec<(String, Listener)>,
    config: RegistryConfig,
}

impl<P: ConfigProvider> SensorRegistry<P> {
    pub fn new(
        provider: P,
        conversions: Arc<ConversionRegistry>,
        presentation: PresentationConfig,
        config: RegistryConfig,
    ) -> Self {
        let hydration = if provider.is_ready() {
            Hydration::Complete
        } else {
            Hydration::pending()
        };
        Self {
            instances: BTreeMap::new(),
            provider,
            conversions,
            presentation,
            hydration,
            alarm_debouncer: Debouncer::new(config.alarm_quiet_ms, config.alarm_max_latency_ms),
            pending_alarm_keys: BTreeMap::new(),
            subscriptions: BTreeMap::new(),
            listeners: Vec::new(),
            config,
        }
    }

    pub fn is_hydrated(&self) -> bool {
        matches!(self.hydration, Hydration::Complete)
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn presentation(&self) -> &PresentationConfig {
        &self.presentation
    }

    pub fn conversions(&self) -> &Arc<ConversionRegistry> {
        &self.conversions
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn get(&self, key: &SensorKey) -> Option<&SensorInstance> {
        self.instances.get(key)
    }

    pub fn instances(&self) -> impl Iterator<Item = &SensorInstance> {
        self.instances.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &SensorKey> {
        self.instances.keys()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Stored or virtual metric of one sensor
    pub fn get_metric(&self, key: &SensorKey, metric_key: &str) -> Option<Cow<'_, MetricValue>> {
        let enrich = EnrichContext::new(&self.conversions, &self.presentation);
        self.instances.get(key)?.get_metric(metric_key, enrich)
    }

    /// Register a listener; returns its id for [`Self::remove_listener`]
    pub fn on_event<F>(&mut self, listener: F) -> String
    where
        F: FnMut(&RegistryEvent) + Send + 'static,
    {
        let id = uuid::Uuid::new_v4().to_string();
        self.listeners.push((id.clone(), Box::new(listener)));
        id
    }

    pub fn remove_listener(&mut self, id: &str) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| listener_id != id);
        self.listeners.len() != before
    }

    fn emit(&mut self, event: RegistryEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }

    /// Apply decoded data to a sensor, creating it on first sight
    ///
    /// Returns the change notification, or `None` when no metric changed.
    /// Alarm re-evaluation is scheduled, not run.
    pub fn update(
        &mut self,
        sensor_type: SensorType,
        instance: u8,
        data: &SensorData,
        now: i64,
    ) -> Option<SensorUpdate> {
        let key = SensorKey::new(sensor_type, instance);
        if !self.instances.contains_key(&key) {
            self.create(key);
        }

        let enrich = EnrichContext::new(&self.conversions, &self.presentation);
        let sensor = self.instances.get_mut(&key)?;
        let changed = sensor.update_metrics(data, now, enrich);

        // Unchanged values still refresh freshness, so they are re-checked too
        let touched: Vec<String> = data
            .fields
            .keys()
            .filter(|k| sensor.metrics().contains_key(k.as_str()))
            .cloned()
            .collect();
        if !touched.is_empty() {
            self.pending_alarm_keys.entry(key).or_default().extend(touched);
            self.alarm_debouncer.request(now);
        }

        if changed.is_empty() {
            return None;
        }
        let update = SensorUpdate {
            sensor_type,
            instance,
            changed_metric_keys: changed,
        };
        self.emit(RegistryEvent::Updated(update.clone()));
        Some(update)
    }

    fn create(&mut self, key: SensorKey) {
        let mut sensor = SensorInstance::new(key.sensor_type, key.instance, self.config.history);
        // Defaults are provisional while loading; hydration replaces them
        sensor.apply_defaults();

        match &mut self.hydration {
            Hydration::Pending { queued, .. } => {
                debug!("{} created before configuration loaded, queued", key);
                queued.insert(key);
            }
            Hydration::Complete => {
                let errors = apply_persisted(&self.provider, &mut sensor);
                if let Some(errors) = errors {
                    log_rejected(&key, &errors);
                }
            }
        }

        for ((sensor_type, metric_key), consumers) in &self.subscriptions {
            if *sensor_type == key.sensor_type {
                for (consumer, window) in consumers {
                    sensor.subscribe_history(metric_key, consumer, *window);
                }
            }
        }

        info!("New sensor {} ({})", key, sensor.name());
        self.instances.insert(key, sensor);
        self.emit(RegistryEvent::Created(key));
    }

    /// Merge persisted configuration into every instance created while the
    /// store was loading
    ///
    /// Runs once; later calls return an empty report. Metric data received
    /// in the meantime is kept. Removals and resets made while loading are
    /// carried out on the store first. User edits made while loading are
    /// laid over the persisted record, never over schema defaults.
    pub fn complete_hydration(&mut self, now: i64) -> Result<HydrationReport, RegistryError> {
        if !self.provider.is_ready() {
            return Err(ConfigStoreError::NotReady.into());
        }
        let (queued, mut edits, removed, cleared) =
            match std::mem::replace(&mut self.hydration, Hydration::Complete) {
                Hydration::Pending {
                    queued,
                    edits,
                    removed,
                    cleared,
                } => (queued, edits, removed, cleared),
                Hydration::Complete => {
                    debug!("Hydration already complete");
                    return Ok(HydrationReport::default());
                }
            };

        if cleared {
            info!("Dropping stored configuration after a reset during startup");
            self.provider.clear()?;
        }
        for key in &removed {
            debug!("Dropping stored configuration of removed sensor {}", key);
            self.provider.remove(key)?;
        }

        let mut report = HydrationReport::default();
        for key in queued {
            let Some(sensor) = self.instances.get_mut(&key) else {
                continue;
            };
            let (stored, unreadable) = match self.provider.load(&key) {
                Ok(stored) => (stored, false),
                Err(e) => {
                    warn!("Skipping stored configuration for {}: {}", key, e);
                    report.skipped += 1;
                    (None, true)
                }
            };

            match edits.remove(&key) {
                Some(pending) => {
                    let merged = pending.overlay(stored, sensor);
                    sensor.apply_defaults();
                    log_rejected(&key, &sensor.apply_configuration(&merged));
                    for (metric_key, enabled) in &pending.enabled {
                        if let Err(e) = sensor.set_alarm_enabled(metric_key, *enabled) {
                            warn!("Dropping alarm toggle for {} {}: {}", key, metric_key, e);
                        }
                    }
                    if let Err(e) = self.provider.save(&key, &sensor.configuration()) {
                        warn!("Failed to persist edits made to {} while loading: {}", key, e);
                    }
                    report.preserved_edits += 1;
                }
                None => match stored {
                    Some(config) => {
                        sensor.apply_defaults();
                        log_rejected(&key, &sensor.apply_configuration(&config));
                        report.applied += 1;
                    }
                    None if unreadable => {}
                    None => report.defaults += 1,
                },
            }

            let keys: Vec<String> = sensor.metric_keys().map(str::to_string).collect();
            if !keys.is_empty() {
                self.pending_alarm_keys.entry(key).or_default().extend(keys);
                self.alarm_debouncer.request(now);
            }
        }
        info!(
            "Configuration hydrated: {} applied, {} defaults, {} edits kept, {} skipped",
            report.applied, report.defaults, report.preserved_edits, report.skipped
        );
        Ok(report)
    }

    /// Write one sensor's configuration through to the store
    ///
    /// While loading, the edited part is remembered instead and merged on
    /// hydration.
    fn persist(&mut self, key: &SensorKey, edit: Edit<'_>) -> Result<(), RegistryError> {
        if let Hydration::Pending { queued, edits, .. } = &mut self.hydration {
            if queued.contains(key) {
                edits.entry(*key).or_default().record(edit);
                return Ok(());
            }
        }
        let sensor = self
            .instances
            .get(key)
            .ok_or(RegistryError::UnknownSensor(*key))?;
        self.provider.save(key, &sensor.configuration())?;
        Ok(())
    }

    fn sensor_mut(&mut self, key: &SensorKey) -> Result<&mut SensorInstance, RegistryError> {
        self.instances
            .get_mut(key)
            .ok_or(RegistryError::UnknownSensor(*key))
    }

    fn schedule_alarm(&mut self, key: SensorKey, metric_key: &str, now: i64) {
        self.pending_alarm_keys
            .entry(key)
            .or_default()
            .insert(metric_key.to_string());
        self.alarm_debouncer.request(now);
    }

    /// User edit: replace one metric's thresholds and persist
    pub fn set_thresholds(
        &mut self,
        key: &SensorKey,
        metric_key: &str,
        thresholds: Thresholds,
        now: i64,
    ) -> Result<(), RegistryError> {
        self.sensor_mut(key)?.update_thresholds(metric_key, thresholds)?;
        self.schedule_alarm(*key, metric_key, now);
        self.persist(key, Edit::Thresholds(metric_key))
    }

    /// User edit: toggle alarms for one metric and persist
    pub fn set_alarm_enabled(
        &mut self,
        key: &SensorKey,
        metric_key: &str,
        enabled: bool,
        now: i64,
    ) -> Result<(), RegistryError> {
        self.sensor_mut(key)?.set_alarm_enabled(metric_key, enabled)?;
        self.schedule_alarm(*key, metric_key, now);
        self.persist(key, Edit::Enabled(metric_key, enabled))
    }

    /// User edit: rename a sensor and persist
    pub fn rename(&mut self, key: &SensorKey, name: &str) -> Result<(), RegistryError> {
        self.sensor_mut(key)?.rename(name);
        self.persist(key, Edit::Name)
    }

    /// User edit: replace a sensor's context and persist
    pub fn set_context(&mut self, key: &SensorKey, context: SensorContext) -> Result<(), RegistryError> {
        self.sensor_mut(key)?.set_context(context)?;
        self.persist(key, Edit::Context)
    }

    /// Run scheduled alarm evaluation if its debounce window has elapsed
    pub fn poll_alarms(&mut self, now: i64) -> Vec<AlarmEvent> {
        if self.alarm_debouncer.take_if_due(now) {
            self.evaluate_pending(now)
        } else {
            Vec::new()
        }
    }

    /// Run scheduled alarm evaluation immediately
    pub fn flush_alarms(&mut self, now: i64) -> Vec<AlarmEvent> {
        if self.alarm_debouncer.flush() {
            self.evaluate_pending(now)
        } else {
            Vec::new()
        }
    }

    pub fn alarms_pending(&self) -> bool {
        self.alarm_debouncer.is_pending()
    }

    fn evaluate_pending(&mut self, now: i64) -> Vec<AlarmEvent> {
        let pending = std::mem::take(&mut self.pending_alarm_keys);
        let mut events = Vec::new();
        for (key, metric_keys) in pending {
            let Some(sensor) = self.instances.get_mut(&key) else {
                continue;
            };
            let metric_keys: Vec<String> = metric_keys.into_iter().collect();
            for change in sensor.evaluate_alarms(Some(&metric_keys), now, self.config.stale_after_ms) {
                events.push(alarm_event(&key, change.metric_key, change.level, now));
            }
        }
        self.publish_alarms(&events);
        events
    }

    /// Re-check every metric, catching ones that went quiet
    pub fn check_staleness(&mut self, now: i64) -> Vec<AlarmEvent> {
        let stale_after_ms = self.config.stale_after_ms;
        let mut events = Vec::new();
        for (key, sensor) in self.instances.iter_mut() {
            for change in sensor.evaluate_alarms(None, now, stale_after_ms) {
                events.push(alarm_event(key, change.metric_key, change.level, now));
            }
        }
        self.publish_alarms(&events);
        events
    }

    fn publish_alarms(&mut self, events: &[AlarmEvent]) {
        for event in events {
            if event.level.is_alarm() {
                warn!(
                    "Alarm {} on {}.{} {}",
                    event.level.as_str(),
                    event.sensor_type,
                    event.instance,
                    event.metric_key
                );
            } else {
                debug!(
                    "{}.{} {} is now {}",
                    event.sensor_type,
                    event.instance,
                    event.metric_key,
                    event.level.as_str()
                );
            }
            self.emit(RegistryEvent::Alarm(event.clone()));
        }
    }

    /// Register a history consumer for a metric on every instance of a type
    pub fn subscribe_history(
        &mut self,
        sensor_type: SensorType,
        metric_key: &str,
        consumer_id: &str,
        window_ms: u64,
    ) {
        self.subscriptions
            .entry((sensor_type, metric_key.to_string()))
            .or_default()
            .insert(consumer_id.to_string(), window_ms);
        for sensor in self
            .instances
            .values_mut()
            .filter(|s| s.sensor_type() == sensor_type)
        {
            sensor.subscribe_history(metric_key, consumer_id, window_ms);
        }
        trace!(
            "{} subscribed to {}.{} history ({} ms)",
            consumer_id,
            sensor_type,
            metric_key,
            window_ms
        );
    }

    /// Remove a history consumer; returns false if it was not subscribed
    pub fn unsubscribe_history(
        &mut self,
        sensor_type: SensorType,
        metric_key: &str,
        consumer_id: &str,
        now: i64,
    ) -> bool {
        let ledger_key = (sensor_type, metric_key.to_string());
        let Some(consumers) = self.subscriptions.get_mut(&ledger_key) else {
            return false;
        };
        if consumers.remove(consumer_id).is_none() {
            return false;
        }
        if consumers.is_empty() {
            self.subscriptions.remove(&ledger_key);
        }
        for sensor in self
            .instances
            .values_mut()
            .filter(|s| s.sensor_type() == sensor_type)
        {
            sensor.unsubscribe_history(metric_key, consumer_id, now);
        }
        true
    }

    /// Periodic history maintenance; returns the number of points removed
    pub fn prune_history(&mut self, now: i64) -> usize {
        let removed: usize = self
            .instances
            .values_mut()
            .map(|sensor| sensor.prune_history(now))
            .sum();
        if removed > 0 {
            trace!("Pruned {} history points", removed);
        }
        removed
    }

    /// Serialized state of every instance, history excluded
    pub fn snapshot(&self) -> Vec<SensorSnapshot> {
        self.instances.values().map(SensorInstance::serialize).collect()
    }

    /// Rebuild instances from snapshots
    ///
    /// Corrupt snapshots are skipped and returned; the rest are restored.
    pub fn restore(&mut self, snapshots: &[SensorSnapshot]) -> Vec<SerializationError> {
        let mut errors = Vec::new();
        for snapshot in snapshots {
            let enrich = EnrichContext::new(&self.conversions, &self.presentation);
            let mut sensor =
                match SensorInstance::deserialize(snapshot, self.config.history, enrich) {
                    Ok(sensor) => sensor,
                    Err(e) => {
                        warn!("Skipping snapshot: {}", e);
                        errors.push(e);
                        continue;
                    }
                };
            let key = sensor.key();
            for ((sensor_type, metric_key), consumers) in &self.subscriptions {
                if *sensor_type == key.sensor_type {
                    for (consumer, window) in consumers {
                        sensor.subscribe_history(metric_key, consumer, *window);
                    }
                }
            }
            if let Hydration::Pending { queued, .. } = &mut self.hydration {
                queued.insert(key);
            }
            let is_new = self.instances.insert(key, sensor).is_none();
            if is_new {
                self.emit(RegistryEvent::Created(key));
            }
        }
        errors
    }

    /// Tear down one sensor and forget its stored configuration
    pub fn remove(&mut self, key: &SensorKey) -> Result<bool, RegistryError> {
        if self.instances.remove(key).is_none() {
            return Ok(false);
        }
        self.pending_alarm_keys.remove(key);
        self.emit(RegistryEvent::Removed(*key));
        match &mut self.hydration {
            Hydration::Pending {
                queued,
                edits,
                removed,
                ..
            } => {
                queued.remove(key);
                edits.remove(key);
                removed.insert(*key);
            }
            Hydration::Complete => self.provider.remove(key)?,
        }
        Ok(true)
    }

    /// Drop every instance and all stored configuration
    pub fn factory_reset(&mut self) -> Result<(), RegistryError> {
        let keys: Vec<SensorKey> = self.instances.keys().copied().collect();
        for key in keys {
            self.instances.remove(&key);
            self.emit(RegistryEvent::Removed(key));
        }
        self.pending_alarm_keys.clear();
        self.alarm_debouncer.flush();
        self.subscriptions.clear();
        if self.is_hydrated() {
            self.provider.clear()?;
        } else {
            // Loaded records are dropped once loading completes
            self.hydration = Hydration::Pending {
                queued: BTreeSet::new(),
                edits: BTreeMap::new(),
                removed: BTreeSet::new(),
                cleared: true,
            };
        }
        info!("Factory reset: all sensors and stored configuration removed");
        Ok(())
    }
}

impl<P: ConfigProvider> EnrichmentTarget for SensorRegistry<P> {
    fn re_enrich_all(&mut self, presentation: &PresentationConfig) -> usize {
        self.presentation = presentation.clone();
        let enrich = EnrichContext::new(&self.conversions, &self.presentation);
        for sensor in self.instances.values_mut() {
            sensor.re_enrich(enrich);
        }
        self.instances.len()
    }
}

/// Load and apply a sensor's stored configuration
///
/// Returns the rejected parts, or `None` when nothing was stored or the
/// record could not be read.
fn apply_persisted<P: ConfigProvider>(
    provider: &P,
    sensor: &mut SensorInstance,
) -> Option<Vec<ConfigValidationError>> {
    match provider.load(&sensor.key()) {
        Ok(Some(config)) => Some(sensor.apply_configuration(&config)),
        Ok(None) => None,
        Err(e) => {
            warn!("Using defaults for {}: {}", sensor.key(), e);
            None
        }
    }
}

fn log_rejected(key: &SensorKey, errors: &[ConfigValidationError]) {
    for error in errors {
        warn!("Stored configuration for {} rejected in part: {}", key, error);
    }
}

fn alarm_event(
    key: &SensorKey,
    metric_key: String,
    level: marine_sens_types::AlarmLevel,
    timestamp: i64,
) -> AlarmEvent {
    AlarmEvent {
        sensor_type: key.sensor_type,
        instance: key.instance,
        metric_key,
        level,
        timestamp,
    }
}
