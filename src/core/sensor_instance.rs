//! Live state of one physical sensor

use super::history::{AdaptiveHistoryBuffer, AppendOutcome, HistoryConfig};
use super::metric_value::{DisplayFields, MetricValue};
use super::schema;
use super::alarm::AlarmEvaluator;
use chrono::DateTime;
use chrono_tz::Tz;
use log::{debug, trace, warn};
use marine_sens_core::ConversionRegistry;
use marine_sens_types::{
    AlarmLevel, ConfigValidationError, DataCategory, FieldValue, PresentationConfig,
    SensorConfiguration, SensorContext, SensorData, SensorKey, SensorSnapshot, SensorType,
    SerializationError, SnapshotMetric, Thresholds,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

/// `<metric>.<view>` keys computed on demand
static VIRTUAL_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\w+)\.(min|max|avg|local)$").expect("virtual metric pattern is valid")
});

/// Conversion inputs needed to enrich metrics
#[derive(Clone, Copy)]
pub struct EnrichContext<'a> {
    pub conversions: &'a ConversionRegistry,
    pub presentation: &'a PresentationConfig,
}

impl<'a> EnrichContext<'a> {
    pub fn new(conversions: &'a ConversionRegistry, presentation: &'a PresentationConfig) -> Self {
        Self {
            conversions,
            presentation,
        }
    }
}

/// Changed alarm level of one metric
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmChange {
    pub metric_key: String,
    pub previous: AlarmLevel,
    pub level: AlarmLevel,
}

pub struct SensorInstance {
    sensor_type: SensorType,
    instance: u8,
    name: String,
    context: Option<SensorContext>,
    /// Context came from the user or stored configuration, not the device
    context_configured: bool,
    metrics: BTreeMap<String, MetricValue>,
    thresholds: BTreeMap<String, Thresholds>,
    history: HashMap<String, AdaptiveHistoryBuffer>,
    alarm_state: BTreeMap<String, AlarmLevel>,
    timestamp: i64,
    /// Bumped on every threshold change; keys the metric alarm caches
    thresholds_version: u64,
    history_config: HistoryConfig,
}

impl SensorInstance {
    pub fn new(sensor_type: SensorType, instance: u8, history_config: HistoryConfig) -> Self {
        Self {
            sensor_type,
            instance,
            name: default_name(sensor_type, instance),
            context: None,
            context_configured: false,
            metrics: BTreeMap::new(),
            thresholds: BTreeMap::new(),
            history: HashMap::new(),
            alarm_state: BTreeMap::new(),
            timestamp: 0,
            thresholds_version: 0,
            history_config,
        }
    }

    pub fn key(&self) -> SensorKey {
        SensorKey::new(self.sensor_type, self.instance)
    }

    pub fn sensor_type(&self) -> SensorType {
        self.sensor_type
    }

    pub fn instance(&self) -> u8 {
        self.instance
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> Option<&SensorContext> {
        self.context.as_ref()
    }

    /// Time of the last metric update
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn metric_keys(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(|k| k.as_str())
    }

    pub fn metrics(&self) -> &BTreeMap<String, MetricValue> {
        &self.metrics
    }

    pub fn thresholds(&self) -> &BTreeMap<String, Thresholds> {
        &self.thresholds
    }

    pub fn thresholds_for(&self, key: &str) -> Option<&Thresholds> {
        self.thresholds.get(key)
    }

    pub fn alarm_level(&self, key: &str) -> AlarmLevel {
        self.alarm_state.get(key).copied().unwrap_or_default()
    }

    pub fn alarm_states(&self) -> &BTreeMap<String, AlarmLevel> {
        &self.alarm_state
    }

    /// Highest alarm level across all metrics
    pub fn worst_alarm(&self) -> AlarmLevel {
        self.alarm_state.values().copied().max().unwrap_or_default()
    }

    pub fn history(&self, key: &str) -> Option<&AdaptiveHistoryBuffer> {
        self.history.get(key)
    }

    /// Apply decoded data; returns the keys whose canonical value changed
    pub fn update_metrics(
        &mut self,
        data: &SensorData,
        timestamp: i64,
        enrich: EnrichContext<'_>,
    ) -> Vec<String> {
        let schema = schema::schema(self.sensor_type);
        let source = schema
            .source_field
            .and_then(|key| data.fields.get(key))
            .and_then(|value| value.as_str())
            .map(str::to_string);

        if let Some(context) = &data.context {
            self.adopt_reported_context(context);
        }

        let mut changed = Vec::new();
        for (key, value) in &data.fields {
            let Some(field) = schema.field(key) else {
                trace!("{} has no field '{}', ignoring", self.sensor_type, key);
                continue;
            };
            if !value_fits(value, field.category) {
                debug!(
                    "Dropping {}.{}: value {} does not fit category {}",
                    self.sensor_type, key, value, field.category
                );
                continue;
            }

            let is_change = self
                .metrics
                .get(key)
                .map_or(true, |existing| existing.value_differs(value));
            let mut metric = MetricValue::new(value.clone(), field.category, timestamp);
            metric.enrich(enrich.conversions, enrich.presentation);
            self.metrics.insert(key.clone(), metric);

            if let (true, FieldValue::Number(n)) = (field.category.is_historized(), value) {
                let config = self.history_config;
                let buffer = self
                    .history
                    .entry(key.clone())
                    .or_insert_with(|| AdaptiveHistoryBuffer::new(config));
                if buffer.append(*n, timestamp, source.as_deref()) == AppendOutcome::SourceReset {
                    debug!(
                        "{} {} history reset: source is now {}",
                        self.key(),
                        key,
                        source.as_deref().unwrap_or("?")
                    );
                }
            }

            if is_change {
                changed.push(key.clone());
            }
        }
        if !data.fields.is_empty() {
            self.timestamp = timestamp;
        }
        changed
    }

    /// Stored metric, or a virtual view computed on demand
    ///
    /// Virtual keys: `<key>.min`, `<key>.max`, `<key>.avg` over the retained
    /// history, and `<key>.local` for date/time metrics in the configured
    /// timezone.
    pub fn get_metric(&self, key: &str, enrich: EnrichContext<'_>) -> Option<Cow<'_, MetricValue>> {
        if let Some(metric) = self.metrics.get(key) {
            return Some(Cow::Borrowed(metric));
        }

        let captures = VIRTUAL_KEY.captures(key)?;
        let base_key = captures.get(1)?.as_str();
        let view = captures.get(2)?.as_str();
        let base = self.metrics.get(base_key)?;

        if view == "local" {
            return local_time_view(base, enrich.presentation).map(Cow::Owned);
        }

        let stats = self.history.get(base_key)?.stats()?;
        let raw = match view {
            "min" => stats.min,
            "max" => stats.max,
            _ => stats.avg,
        };
        Some(Cow::Owned(base.derive(
            raw,
            stats.last_timestamp,
            enrich.conversions,
            enrich.presentation,
        )))
    }

    /// Replace the thresholds of one metric after validating them
    ///
    /// On failure nothing changes.
    pub fn update_thresholds(
        &mut self,
        key: &str,
        thresholds: Thresholds,
    ) -> Result<(), ConfigValidationError> {
        let alarmable = schema::field(self.sensor_type, key).map_or(false, |f| f.alarmable);
        let result = if alarmable {
            thresholds.validate()
        } else {
            Err(ConfigValidationError::NotAlarmable {
                sensor_type: self.sensor_type,
                key: key.to_string(),
            })
        };
        if let Err(e) = result {
            warn!("Rejected thresholds for {} {}: {}", self.key(), key, e);
            return Err(e);
        }
        self.thresholds.insert(key.to_string(), thresholds);
        self.thresholds_version += 1;
        Ok(())
    }

    pub fn set_alarm_enabled(&mut self, key: &str, enabled: bool) -> Result<(), ConfigValidationError> {
        let Some(existing) = self.thresholds.get(key) else {
            return Err(ConfigValidationError::NotAlarmable {
                sensor_type: self.sensor_type,
                key: key.to_string(),
            });
        };
        let mut updated = existing.clone();
        updated.enabled = enabled;
        self.update_thresholds(key, updated)
    }

    pub fn rename(&mut self, name: &str) {
        let trimmed = name.trim();
        self.name = if trimmed.is_empty() {
            default_name(self.sensor_type, self.instance)
        } else {
            trimmed.to_string()
        };
    }

    /// Attach a context after checking it belongs to this sensor type
    pub fn set_context(&mut self, context: SensorContext) -> Result<(), ConfigValidationError> {
        context.validate_for(self.sensor_type)?;
        self.context = Some(context);
        self.context_configured = true;
        Ok(())
    }

    /// Take a context reported by the device itself
    ///
    /// A context the user configured is kept. Thresholds still at their
    /// defaults follow the new context's defaults.
    fn adopt_reported_context(&mut self, context: &SensorContext) {
        if self.context.as_ref() == Some(context) {
            return;
        }
        if self.context_configured {
            trace!("{} keeps its configured context", self.key());
            return;
        }
        if let Err(e) = context.validate_for(self.sensor_type) {
            warn!("Ignoring reported context for {}: {}", self.key(), e);
            return;
        }
        let old_defaults = schema::default_thresholds(self.sensor_type, self.context.as_ref());
        let new_defaults = schema::default_thresholds(self.sensor_type, Some(context));
        for (key, thresholds) in new_defaults {
            let untouched = match (self.thresholds.get(&key), old_defaults.get(&key)) {
                (Some(current), Some(default)) => current == default,
                (None, _) => true,
                _ => false,
            };
            if untouched {
                self.thresholds.insert(key, thresholds);
            }
        }
        self.context = Some(context.clone());
        self.thresholds_version += 1;
    }

    /// Re-evaluate alarm levels
    ///
    /// `keys` limits the pass to those metrics; `None` checks every metric.
    /// Metrics older than `stale_after_ms` are reported stale. Returns only
    /// the levels that changed.
    pub fn evaluate_alarms(
        &mut self,
        keys: Option<&[String]>,
        now: i64,
        stale_after_ms: u64,
    ) -> Vec<AlarmChange> {
        let candidates: Vec<String> = match keys {
            Some(keys) => keys.to_vec(),
            None => self.metrics.keys().cloned().collect(),
        };

        let mut changes = Vec::new();
        for key in candidates {
            let Some(metric) = self.metrics.get(&key) else {
                continue;
            };
            let evaluated = match self.thresholds.get(&key) {
                Some(thresholds) => metric.cached_alarm_state(self.thresholds_version, thresholds),
                None => AlarmLevel::Normal,
            };
            let stale = now - metric.timestamp() > stale_after_ms as i64;
            let level = AlarmEvaluator::with_freshness(evaluated, stale);

            let previous = self.alarm_level(&key);
            if level != previous {
                if level == AlarmLevel::Normal {
                    self.alarm_state.remove(&key);
                } else {
                    self.alarm_state.insert(key.clone(), level);
                }
                changes.push(AlarmChange {
                    metric_key: key,
                    previous,
                    level,
                });
            }
        }
        changes
    }

    /// Recompute every display field under a new presentation
    pub fn re_enrich(&mut self, enrich: EnrichContext<'_>) {
        for metric in self.metrics.values_mut() {
            metric.enrich(enrich.conversions, enrich.presentation);
        }
    }

    /// Register a history consumer for one metric
    pub fn subscribe_history(&mut self, key: &str, consumer_id: &str, window_ms: u64) {
        let config = self.history_config;
        self.history
            .entry(key.to_string())
            .or_insert_with(|| AdaptiveHistoryBuffer::new(config))
            .subscribe(consumer_id, window_ms);
    }

    pub fn unsubscribe_history(&mut self, key: &str, consumer_id: &str, now: i64) -> bool {
        self.history
            .get_mut(key)
            .map_or(false, |buffer| buffer.unsubscribe(consumer_id, now))
    }

    /// Prune every history buffer; returns the number of points removed
    pub fn prune_history(&mut self, now: i64) -> usize {
        let mut removed = 0;
        for (key, buffer) in self.history.iter_mut() {
            let outcome = buffer.prune(now);
            if outcome.expired {
                debug!("{} {} history discarded after grace period", self.sensor_type, key);
            }
            removed += outcome.removed;
        }
        removed
    }

    /// Reset name, context and thresholds to schema defaults
    pub fn apply_defaults(&mut self) {
        self.name = default_name(self.sensor_type, self.instance);
        if self.context.is_none() {
            self.context = SensorContext::default_for(self.sensor_type);
        }
        self.thresholds = schema::default_thresholds(self.sensor_type, self.context.as_ref());
        self.thresholds_version += 1;
    }

    /// Merge a persisted configuration over the current state
    ///
    /// Each part is validated on its own; invalid parts are skipped and
    /// returned, valid parts are applied.
    pub fn apply_configuration(&mut self, config: &SensorConfiguration) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        if let Some(name) = &config.name {
            self.rename(name);
        }
        if let Some(context) = &config.context {
            match self.set_context(context.clone()) {
                Ok(()) => {
                    // Context can change which direction defaults alarm in
                    for (key, thresholds) in
                        schema::default_thresholds(self.sensor_type, self.context.as_ref())
                    {
                        if !config.metrics.contains_key(&key) {
                            self.thresholds.insert(key, thresholds);
                        }
                    }
                }
                Err(e) => errors.push(e),
            }
        }
        for (key, thresholds) in &config.metrics {
            if let Err(e) = self.update_thresholds(key, thresholds.clone()) {
                errors.push(e);
            }
        }
        self.thresholds_version += 1;
        errors
    }

    /// Configuration as it would be persisted
    pub fn configuration(&self) -> SensorConfiguration {
        SensorConfiguration {
            name: Some(self.name.clone()),
            context: self.context.clone(),
            metrics: self.thresholds.clone(),
        }
    }

    pub fn serialize(&self) -> SensorSnapshot {
        SensorSnapshot {
            sensor_type: self.sensor_type,
            instance: self.instance,
            name: self.name.clone(),
            metrics: self
                .metrics
                .iter()
                .map(|(key, metric)| {
                    (
                        key.clone(),
                        SnapshotMetric {
                            si_value: metric.si_value().clone(),
                            category: metric.category(),
                            timestamp: metric.timestamp(),
                        },
                    )
                })
                .collect(),
            thresholds: self.thresholds.clone(),
            timestamp: self.timestamp,
            context: self.context.clone(),
        }
    }

    /// Rebuild an instance from a snapshot, enriching every metric
    ///
    /// History starts empty.
    pub fn deserialize(
        snapshot: &SensorSnapshot,
        history_config: HistoryConfig,
        enrich: EnrichContext<'_>,
    ) -> Result<Self, SerializationError> {
        let key = SensorKey::new(snapshot.sensor_type, snapshot.instance).storage_key();
        let inconsistent = |reason: String| SerializationError::Inconsistent {
            key: key.clone(),
            reason,
        };

        let mut instance = Self::new(snapshot.sensor_type, snapshot.instance, history_config);
        instance.rename(&snapshot.name);
        if let Some(context) = &snapshot.context {
            instance
                .set_context(context.clone())
                .map_err(|e| inconsistent(e.to_string()))?;
        }
        for (metric_key, thresholds) in &snapshot.thresholds {
            thresholds
                .validate()
                .map_err(|e| inconsistent(format!("{}: {}", metric_key, e)))?;
            instance
                .thresholds
                .insert(metric_key.clone(), thresholds.clone());
        }
        for (metric_key, stored) in &snapshot.metrics {
            if !value_fits(&stored.si_value, stored.category) {
                return Err(inconsistent(format!(
                    "{} holds {} which is not a valid {}",
                    metric_key, stored.si_value, stored.category
                )));
            }
            let mut metric = MetricValue::new(
                stored.si_value.clone(),
                stored.category,
                stored.timestamp,
            );
            metric.enrich(enrich.conversions, enrich.presentation);
            instance.metrics.insert(metric_key.clone(), metric);
        }
        instance.timestamp = snapshot.timestamp;
        Ok(instance)
    }
}

fn default_name(sensor_type: SensorType, instance: u8) -> String {
    format!("{} {}", sensor_type.display_name(), instance)
}

/// Text goes with the text category, finite numbers with every other one
fn value_fits(value: &FieldValue, category: DataCategory) -> bool {
    match value {
        FieldValue::Text(_) => category == DataCategory::Text,
        FieldValue::Number(n) => category.is_numeric() && n.is_finite(),
    }
}

fn local_time_view(base: &MetricValue, presentation: &PresentationConfig) -> Option<MetricValue> {
    if base.category() != DataCategory::DateTime {
        return None;
    }
    let millis = base.as_f64()? as i64;
    let tz: Tz = presentation
        .timezone
        .as_deref()
        .unwrap_or("UTC")
        .parse()
        .ok()?;
    let local = DateTime::from_timestamp_millis(millis)?.with_timezone(&tz);
    let formatted = local.format("%Y-%m-%d %H:%M:%S").to_string();
    let display = DisplayFields {
        display_value: Some(millis as f64),
        unit: local.format("%Z").to_string(),
        formatted_value_with_unit: format!("{} {}", formatted, local.format("%Z")),
        formatted_value: formatted,
    };
    Some(MetricValue::number(millis as f64, DataCategory::DateTime, base.timestamp()).with_display(display))
}

#[cfg(test)]
mod tests {
    use super::*;
    use marine_sens_types::{BatteryContext, FluidType, TankContext, UnitRegion};

    fn conversions() -> ConversionRegistry {
        ConversionRegistry::new().unwrap()
    }

    fn battery() -> SensorInstance {
        let mut instance = SensorInstance::new(SensorType::Battery, 0, HistoryConfig::default());
        instance.apply_defaults();
        instance
    }

    #[test]
    fn test_update_reports_changed_keys() {
        let conversions = conversions();
        let presentation = PresentationConfig::default();
        let enrich = EnrichContext::new(&conversions, &presentation);
        let mut instance = battery();

        let data = SensorData::new().with("voltage", 12.6).with("current", -3.2);
        let changed = instance.update_metrics(&data, 1_000, enrich);
        assert_eq!(changed, vec!["current".to_string(), "voltage".to_string()]);

        let data = SensorData::new().with("voltage", 12.6).with("current", -3.0);
        let changed = instance.update_metrics(&data, 2_000, enrich);
        assert_eq!(changed, vec!["current".to_string()]);
        assert_eq!(instance.timestamp(), 2_000);
        assert_eq!(
            instance.get_metric("voltage", enrich).unwrap().formatted_value_with_unit(),
            "12.60 V"
        );
    }

    #[test]
    fn test_unknown_and_mistyped_fields_ignored() {
        let conversions = conversions();
        let presentation = PresentationConfig::default();
        let enrich = EnrichContext::new(&conversions, &presentation);
        let mut instance = battery();
        let data = SensorData::new()
            .with("flux", 1.0)
            .with("voltage", "twelve")
            .with("current", f64::NAN);
        assert!(instance.update_metrics(&data, 0, enrich).is_empty());
        assert!(instance.metrics().is_empty());
    }

    #[test]
    fn test_text_fields_not_historized() {
        let conversions = conversions();
        let presentation = PresentationConfig::default();
        let enrich = EnrichContext::new(&conversions, &presentation);
        let mut instance = SensorInstance::new(SensorType::Depth, 0, HistoryConfig::default());
        let data = SensorData::new().with("depth", 5.2).with("depthSource", "DPT");
        instance.update_metrics(&data, 0, enrich);
        assert_eq!(instance.history("depth").map(|h| h.len()), Some(1));
        assert!(instance.history("depthSource").is_none());
        assert_eq!(instance.get_metric("depthSource", enrich).unwrap().formatted_value(), "DPT");
    }

    #[test]
    fn test_depth_source_switch_resets_history() {
        let conversions = conversions();
        let presentation = PresentationConfig::default();
        let enrich = EnrichContext::new(&conversions, &presentation);
        let mut instance = SensorInstance::new(SensorType::Depth, 0, HistoryConfig::default());
        instance.update_metrics(&SensorData::new().with("depth", 5.2).with("depthSource", "DPT"), 0, enrich);
        instance.update_metrics(&SensorData::new().with("depth", 5.3).with("depthSource", "DPT"), 1_000, enrich);
        assert_eq!(instance.history("depth").unwrap().len(), 2);
        instance.update_metrics(&SensorData::new().with("depth", 5.5).with("depthSource", "DBT"), 2_000, enrich);
        assert_eq!(instance.history("depth").unwrap().len(), 1);
    }

    #[test]
    fn test_virtual_statistics() {
        let conversions = conversions();
        let presentation = PresentationConfig::for_region(UnitRegion::Metric);
        let enrich = EnrichContext::new(&conversions, &presentation);
        let mut instance = battery();
        for (i, v) in [12.0, 13.0, 12.5].iter().enumerate() {
            instance.update_metrics(&SensorData::new().with("voltage", *v), i as i64 * 1_000, enrich);
        }
        let min = instance.get_metric("voltage.min", enrich).unwrap();
        assert_eq!(min.formatted_value_with_unit(), "12.00 V");
        let max = instance.get_metric("voltage.max", enrich).unwrap();
        assert_eq!(max.as_f64(), Some(13.0));
        let avg = instance.get_metric("voltage.avg", enrich).unwrap();
        assert_eq!(avg.formatted_value(), "12.50");
        // Virtual views never become stored metrics
        assert_eq!(instance.metrics().len(), 1);
        assert!(instance.get_metric("voltage.median", enrich).is_none());
        assert!(instance.get_metric("current.max", enrich).is_none());
    }

    #[test]
    fn test_local_time_view() {
        let conversions = conversions();
        let presentation = PresentationConfig {
            timezone: Some("Europe/Berlin".to_string()),
            ..Default::default()
        };
        let enrich = EnrichContext::new(&conversions, &presentation);
        let mut instance = SensorInstance::new(SensorType::Gps, 0, HistoryConfig::default());
        // 2024-01-15 12:00:00 UTC
        let noon = 1_705_320_000_000_i64;
        instance.update_metrics(&SensorData::new().with("utcDateTime", noon as f64), noon, enrich);
        let utc = instance.get_metric("utcDateTime", enrich).unwrap();
        assert_eq!(utc.formatted_value(), "2024-01-15 12:00:00");
        let local = instance.get_metric("utcDateTime.local", enrich).unwrap();
        assert_eq!(local.formatted_value(), "2024-01-15 13:00:00");
        assert_eq!(local.unit(), "CET");
        assert!(instance.history("utcDateTime").is_none());
    }

    #[test]
    fn test_rejected_thresholds_keep_previous() {
        let mut instance = battery();
        instance
            .update_thresholds("voltage", Thresholds::below(10.5, 11.0))
            .unwrap();
        let reversed = Thresholds::below(11.0, 10.5);
        assert!(instance.update_thresholds("voltage", reversed).is_err());
        assert_eq!(
            instance.thresholds_for("voltage"),
            Some(&Thresholds::below(10.5, 11.0))
        );
        assert!(matches!(
            instance.update_thresholds("capacity", Thresholds::below(1.0, 2.0)),
            Err(ConfigValidationError::NotAlarmable { .. })
        ));
    }

    #[test]
    fn test_alarm_levels_follow_voltage() {
        let conversions = conversions();
        let presentation = PresentationConfig::default();
        let enrich = EnrichContext::new(&conversions, &presentation);
        let mut instance = battery();
        instance
            .update_thresholds("voltage", Thresholds::below(10.5, 11.0))
            .unwrap();

        let mut level_for = |value: f64, now: i64| {
            instance.update_metrics(&SensorData::new().with("voltage", value), now, enrich);
            instance.evaluate_alarms(Some(&["voltage".to_string()]), now, 10_000);
            instance.alarm_level("voltage")
        };
        assert_eq!(level_for(10.0, 0), AlarmLevel::Critical);
        assert_eq!(level_for(10.8, 1_000), AlarmLevel::Warning);
        assert_eq!(level_for(12.0, 2_000), AlarmLevel::Normal);
    }

    #[test]
    fn test_threshold_change_invalidates_cached_level() {
        let conversions = conversions();
        let presentation = PresentationConfig::default();
        let enrich = EnrichContext::new(&conversions, &presentation);
        let mut instance = battery();
        instance.update_metrics(&SensorData::new().with("voltage", 11.9), 0, enrich);
        instance.update_thresholds("voltage", Thresholds::below(10.5, 11.0)).unwrap();
        instance.evaluate_alarms(None, 0, 10_000);
        assert_eq!(instance.alarm_level("voltage"), AlarmLevel::Normal);

        instance.update_thresholds("voltage", Thresholds::below(11.5, 12.0)).unwrap();
        let changes = instance.evaluate_alarms(None, 0, 10_000);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].level, AlarmLevel::Warning);
    }

    #[test]
    fn test_staleness() {
        let conversions = conversions();
        let presentation = PresentationConfig::default();
        let enrich = EnrichContext::new(&conversions, &presentation);
        let mut instance = battery();
        instance.update_metrics(&SensorData::new().with("voltage", 12.8).with("current", 1.0), 0, enrich);
        let changes = instance.evaluate_alarms(None, 15_000, 10_000);
        assert_eq!(changes.len(), 2);
        assert_eq!(instance.alarm_level("current"), AlarmLevel::Stale);

        instance.update_metrics(&SensorData::new().with("current", 1.5), 16_000, enrich);
        instance.evaluate_alarms(None, 16_000, 10_000);
        assert_eq!(instance.alarm_level("current"), AlarmLevel::Normal);
        assert_eq!(instance.alarm_level("voltage"), AlarmLevel::Stale);
    }

    #[test]
    fn test_context_validated_on_update() {
        let conversions = conversions();
        let presentation = PresentationConfig::default();
        let enrich = EnrichContext::new(&conversions, &presentation);
        let mut instance = battery();
        let mut data = SensorData::new().with("voltage", 12.0);
        data.context = Some(SensorContext::Tank(TankContext::default()));
        instance.update_metrics(&data, 0, enrich);
        assert!(matches!(instance.context(), Some(SensorContext::Battery(_))));
        assert!(instance.set_context(SensorContext::Battery(BatteryContext::default())).is_ok());
    }

    #[test]
    fn test_reported_tank_context_switches_default_direction() {
        let conversions = conversions();
        let presentation = PresentationConfig::default();
        let enrich = EnrichContext::new(&conversions, &presentation);
        let mut instance = SensorInstance::new(SensorType::Tank, 0, HistoryConfig::default());
        instance.apply_defaults();
        let mut data = SensorData::new().with("level", 85.0);
        data.context = Some(SensorContext::Tank(TankContext {
            fluid_type: FluidType::BlackWater,
            capacity_l: Some(80.0),
        }));
        instance.update_metrics(&data, 0, enrich);
        assert_eq!(instance.thresholds_for("level"), Some(&Thresholds::above(90.0, 80.0)));
        instance.evaluate_alarms(None, 0, 10_000);
        assert_eq!(instance.alarm_level("level"), AlarmLevel::Warning);

        // A configured context is not overwritten by the device
        instance
            .set_context(SensorContext::Tank(TankContext {
                fluid_type: FluidType::WasteWater,
                capacity_l: None,
            }))
            .unwrap();
        let mut data = SensorData::new().with("level", 86.0);
        data.context = Some(SensorContext::Tank(TankContext::default()));
        instance.update_metrics(&data, 1_000, enrich);
        assert!(matches!(
            instance.context(),
            Some(SensorContext::Tank(TankContext { fluid_type: FluidType::WasteWater, .. }))
        ));
    }

    #[test]
    fn test_serialize_round_trip() {
        let conversions = conversions();
        let presentation = PresentationConfig::for_region(UnitRegion::NauticalUs);
        let enrich = EnrichContext::new(&conversions, &presentation);
        let mut instance = battery();
        instance.rename("House bank");
        instance.update_thresholds("voltage", Thresholds::below(10.5, 11.0)).unwrap();
        instance.update_metrics(&SensorData::new().with("voltage", 12.34).with("temperature", 25.0), 5_000, enrich);

        let snapshot = instance.serialize();
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: SensorSnapshot = serde_json::from_str(&json).unwrap();
        let restored = SensorInstance::deserialize(&parsed, HistoryConfig::default(), enrich).unwrap();

        assert_eq!(restored.name(), "House bank");
        assert_eq!(restored.thresholds(), instance.thresholds());
        assert_eq!(restored.timestamp(), 5_000);
        for key in ["voltage", "temperature"] {
            let a = instance.get_metric(key, enrich).unwrap();
            let b = restored.get_metric(key, enrich).unwrap();
            assert_eq!(a.si_value(), b.si_value());
            assert_eq!(a.formatted_value(), b.formatted_value());
        }
        assert!(restored.history("voltage").is_none());
    }

    #[test]
    fn test_deserialize_rejects_corrupt_metric() {
        let conversions = conversions();
        let presentation = PresentationConfig::default();
        let enrich = EnrichContext::new(&conversions, &presentation);
        let mut snapshot = battery().serialize();
        snapshot.metrics.insert(
            "voltage".into(),
            SnapshotMetric {
                si_value: FieldValue::from("oops"),
                category: DataCategory::Voltage,
                timestamp: 0,
            },
        );
        assert!(matches!(
            SensorInstance::deserialize(&snapshot, HistoryConfig::default(), enrich),
            Err(SerializationError::Inconsistent { .. })
        ));
    }

    #[test]
    fn test_apply_configuration_partial_failure() {
        let mut instance = battery();
        let mut config = SensorConfiguration {
            name: Some("Start".into()),
            ..Default::default()
        };
        config.metrics.insert("voltage".into(), Thresholds::below(10.0, 10.8));
        config.metrics.insert("stateOfCharge".into(), Thresholds::below(50.0, 30.0));
        let errors = instance.apply_configuration(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(instance.name(), "Start");
        assert_eq!(instance.thresholds_for("voltage"), Some(&Thresholds::below(10.0, 10.8)));
        // Invalid entry left the default in place
        assert_eq!(
            instance.thresholds_for("stateOfCharge"),
            Some(&Thresholds::below(20.0, 40.0))
        );
    }
}
