//! Adaptive history buffers
//!
//! Each numeric metric keeps a time series whose depth follows its
//! subscribers: the retention window is the longest window any active
//! consumer asked for. Pruning happens on a periodic tick, never on append.

use marine_sens_core::constants::{
    DEFAULT_BASELINE_WINDOW_MS, DEFAULT_GRACE_PERIOD_MS, DEFAULT_PRUNE_INTERVAL_MS,
    DEFAULT_SAMPLE_INTERVAL_MS, DUPLICATE_TIME_EPSILON_MS, DUPLICATE_VALUE_EPSILON,
    HISTORY_HARD_CAP, HISTORY_MIN_ENTRIES,
};
use marine_sens_types::HistoryPoint;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Retention tuning shared by all buffers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryConfig {
    /// Delay between losing the last subscriber and discarding the data
    pub grace_period_ms: u64,
    /// Window kept while nobody is subscribed
    pub baseline_window_ms: u64,
    /// Expected spacing of samples, used to size `max_entries`
    pub sample_interval_ms: u64,
    pub duplicate_time_epsilon_ms: i64,
    pub duplicate_value_epsilon: f64,
    pub min_entries: usize,
    pub hard_cap: usize,
    pub prune_interval_ms: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: DEFAULT_GRACE_PERIOD_MS,
            baseline_window_ms: DEFAULT_BASELINE_WINDOW_MS,
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            duplicate_time_epsilon_ms: DUPLICATE_TIME_EPSILON_MS,
            duplicate_value_epsilon: DUPLICATE_VALUE_EPSILON,
            min_entries: HISTORY_MIN_ENTRIES,
            hard_cap: HISTORY_HARD_CAP,
            prune_interval_ms: DEFAULT_PRUNE_INTERVAL_MS,
        }
    }
}

impl HistoryConfig {
    /// Entry cap for a window: one entry per expected sample, clamped
    pub fn max_entries_for(&self, window_ms: u64) -> usize {
        let per_window = (window_ms / self.sample_interval_ms.max(1)) as usize;
        per_window.clamp(self.min_entries, self.hard_cap.max(self.min_entries))
    }
}

/// What happened to an appended point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Stored,
    /// Too close in time and value to the previous point
    Suppressed,
    /// The reference source changed; older points were dropped first
    SourceReset,
}

/// Result of one prune pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PruneOutcome {
    pub removed: usize,
    /// The grace period ran out and the buffer was discarded
    pub expired: bool,
}

/// Summary statistics over the retained points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub count: usize,
    pub last_timestamp: i64,
}

#[derive(Debug, Clone)]
pub struct AdaptiveHistoryBuffer {
    points: VecDeque<HistoryPoint>,
    source: Option<String>,
    /// consumer id -> requested window
    subscriptions: HashMap<String, u64>,
    time_window_ms: u64,
    max_entries: usize,
    orphaned_since: Option<i64>,
    config: HistoryConfig,
}

impl AdaptiveHistoryBuffer {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            points: VecDeque::new(),
            source: None,
            subscriptions: HashMap::new(),
            time_window_ms: config.baseline_window_ms,
            max_entries: config.max_entries_for(config.baseline_window_ms),
            orphaned_since: None,
            config,
        }
    }

    /// Register interest in `time_window_ms` of history
    ///
    /// A longer window applies at once so no data is lost; a shorter one
    /// waits for the next prune.
    pub fn subscribe(&mut self, consumer_id: &str, time_window_ms: u64) {
        self.subscriptions
            .insert(consumer_id.to_string(), time_window_ms);
        self.orphaned_since = None;
        if time_window_ms > self.time_window_ms {
            self.set_window(time_window_ms);
        }
    }

    /// Drop a consumer; the last one leaving starts the grace period
    pub fn unsubscribe(&mut self, consumer_id: &str, now: i64) -> bool {
        let removed = self.subscriptions.remove(consumer_id).is_some();
        if removed && self.subscriptions.is_empty() {
            self.orphaned_since = Some(now);
        }
        removed
    }

    /// Largest window requested by an active subscription
    pub fn requested_window_ms(&self) -> Option<u64> {
        self.subscriptions.values().copied().max()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_orphaned(&self) -> bool {
        self.orphaned_since.is_some()
    }

    /// Append a point in arrival order
    pub fn append(&mut self, value: f64, timestamp: i64, source: Option<&str>) -> AppendOutcome {
        let mut outcome = AppendOutcome::Stored;
        if let Some(source) = source {
            if self.source.as_deref() != Some(source) {
                if !self.points.is_empty() {
                    self.points.clear();
                    outcome = AppendOutcome::SourceReset;
                }
                self.source = Some(source.to_string());
            }
        }

        if outcome == AppendOutcome::Stored {
            if let Some(last) = self.points.back() {
                let close_in_time =
                    (timestamp - last.timestamp).abs() <= self.config.duplicate_time_epsilon_ms;
                let close_in_value =
                    (value - last.value).abs() <= self.config.duplicate_value_epsilon;
                if close_in_time && close_in_value {
                    return AppendOutcome::Suppressed;
                }
            }
        }

        self.points.push_back(HistoryPoint { value, timestamp });
        outcome
    }

    /// Apply the current window and entry cap
    pub fn prune(&mut self, now: i64) -> PruneOutcome {
        if let Some(since) = self.orphaned_since {
            if now - since >= self.config.grace_period_ms as i64 {
                let removed = self.points.len();
                self.clear();
                return PruneOutcome {
                    removed,
                    expired: true,
                };
            }
        } else {
            let window = self
                .requested_window_ms()
                .unwrap_or(self.config.baseline_window_ms);
            if window != self.time_window_ms {
                self.set_window(window);
            }
        }

        let before = self.points.len();
        let cutoff = now - self.time_window_ms as i64;
        while self.points.front().map_or(false, |p| p.timestamp < cutoff) {
            self.points.pop_front();
        }
        while self.points.len() > self.max_entries {
            self.points.pop_front();
        }
        PruneOutcome {
            removed: before - self.points.len(),
            expired: false,
        }
    }

    /// Discard all points and return to the baseline window
    pub fn clear(&mut self) {
        self.points.clear();
        self.source = None;
        self.orphaned_since = None;
        self.set_window(self.config.baseline_window_ms);
    }

    fn set_window(&mut self, window_ms: u64) {
        self.time_window_ms = window_ms;
        self.max_entries = self.config.max_entries_for(window_ms);
    }

    pub fn time_window_ms(&self) -> u64 {
        self.time_window_ms
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = &HistoryPoint> {
        self.points.iter()
    }

    /// Points at or after `since`
    pub fn points_since(&self, since: i64) -> Vec<HistoryPoint> {
        self.points
            .iter()
            .filter(|p| p.timestamp >= since)
            .copied()
            .collect()
    }

    pub fn stats(&self) -> Option<HistoryStats> {
        let last = self.points.back()?;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for point in &self.points {
            min = min.min(point.value);
            max = max.max(point.value);
            sum += point.value;
        }
        Some(HistoryStats {
            min,
            max,
            avg: sum / self.points.len() as f64,
            count: self.points.len(),
            last_timestamp: last.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: u64 = 60_000;

    fn buffer() -> AdaptiveHistoryBuffer {
        AdaptiveHistoryBuffer::new(HistoryConfig::default())
    }

    #[test]
    fn test_duplicate_suppression() {
        let mut history = buffer();
        assert_eq!(history.append(5.2, 1_000, None), AppendOutcome::Stored);
        assert_eq!(history.append(5.2, 1_050, None), AppendOutcome::Suppressed);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_flat_readings_far_apart_are_kept() {
        let mut history = buffer();
        history.append(5.2, 1_000, None);
        history.append(5.2, 2_000, None);
        // Different value inside the time epsilon is kept too
        history.append(5.9, 2_010, None);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_source_switch_resets() {
        let mut history = buffer();
        assert_eq!(history.append(5.2, 1_000, Some("DPT")), AppendOutcome::Stored);
        assert_eq!(
            history.append(5.5, 2_000, Some("DBT")),
            AppendOutcome::SourceReset
        );
        assert_eq!(history.len(), 1);
        assert_eq!(history.source(), Some("DBT"));
        assert_eq!(history.points().next().map(|p| p.value), Some(5.5));
    }

    #[test]
    fn test_retention_window_union() {
        let mut history = buffer();
        history.subscribe("a", 5 * MINUTE);
        history.subscribe("b", 10 * MINUTE);
        assert_eq!(history.time_window_ms(), 10 * MINUTE);

        history.unsubscribe("b", 0);
        // Shrinks on the next prune, not immediately
        assert_eq!(history.time_window_ms(), 10 * MINUTE);
        history.prune(1_000);
        assert_eq!(history.time_window_ms(), 5 * MINUTE);
    }

    #[test]
    fn test_prune_drops_points_outside_window() {
        let mut history = buffer();
        history.subscribe("a", MINUTE);
        for i in 0..10 {
            history.append(i as f64, i * 20_000, None);
        }
        // Appending never prunes
        assert_eq!(history.len(), 10);
        let outcome = history.prune(180_000);
        assert_eq!(outcome.removed, 6);
        assert_eq!(history.points().next().map(|p| p.timestamp), Some(120_000));
    }

    #[test]
    fn test_entry_cap() {
        let config = HistoryConfig {
            min_entries: 4,
            hard_cap: 5,
            ..HistoryConfig::default()
        };
        let mut history = AdaptiveHistoryBuffer::new(config);
        for i in 0..20 {
            history.append(i as f64, 1_000 + i * 200, None);
        }
        history.prune(5_000);
        assert_eq!(history.len(), 5);
        assert_eq!(history.points().last().map(|p| p.value), Some(19.0));
    }

    #[test]
    fn test_grace_period_before_discard() {
        let config = HistoryConfig {
            grace_period_ms: 2 * MINUTE,
            ..HistoryConfig::default()
        };
        let mut history = AdaptiveHistoryBuffer::new(config);
        history.subscribe("widget", 10 * MINUTE);
        history.append(1.0, 0, None);
        history.unsubscribe("widget", 1_000);

        let outcome = history.prune(60_000);
        assert!(!outcome.expired);
        assert_eq!(history.len(), 1);
        assert_eq!(history.time_window_ms(), 10 * MINUTE);

        // Remount inside the grace period keeps the data
        history.subscribe("widget", 10 * MINUTE);
        history.unsubscribe("widget", 100_000);
        let outcome = history.prune(100_000 + 2 * MINUTE as i64);
        assert!(outcome.expired);
        assert!(history.is_empty());
        assert_eq!(history.time_window_ms(), HistoryConfig::default().baseline_window_ms);
    }

    #[test]
    fn test_stats() {
        let mut history = buffer();
        assert!(history.stats().is_none());
        for (i, v) in [4.0, 8.0, 6.0].iter().enumerate() {
            history.append(*v, i as i64 * 1_000, None);
        }
        let stats = history.stats().unwrap();
        assert_eq!(stats.min, 4.0);
        assert_eq!(stats.max, 8.0);
        assert_eq!(stats.avg, 6.0);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.last_timestamp, 2_000);
    }
}
