//! Shared constants: unit factors and pipeline timing defaults

/// Shown wherever a value is missing or invalid
pub const NO_DATA: &str = "---";

// Unit factors used by decoders (multiply to reach the canonical unit)
pub const KNOTS_TO_MPS: f64 = 0.514444;
pub const KMH_TO_MPS: f64 = 1.0 / 3.6;
pub const FEET_TO_M: f64 = 0.3048;
pub const FATHOMS_TO_M: f64 = 1.8288;
pub const NAUTICAL_MILE_M: f64 = 1852.0;
pub const KELVIN_OFFSET: f64 = 273.15;
pub const BAR_TO_PA: f64 = 100_000.0;
pub const INHG_TO_PA: f64 = 3386.389;
pub const RAD_TO_DEG: f64 = 180.0 / std::f64::consts::PI;

// Alarm evaluation
pub const DEFAULT_ALARM_QUIET_MS: u64 = 250;
pub const DEFAULT_ALARM_MAX_LATENCY_MS: u64 = 1_000;
/// Alarm latency may never be configured above this
pub const ALARM_LATENCY_CEILING_MS: u64 = 5_000;
pub const DEFAULT_STALE_AFTER_MS: u64 = 10_000;

// Re-enrichment after presentation changes
pub const DEFAULT_ENRICHMENT_DEBOUNCE_MS: u64 = 50;
pub const ENRICHMENT_DEBOUNCE_CEILING_MS: u64 = 100;

// History retention
pub const DEFAULT_PRUNE_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 120_000;
/// Window kept for metrics nobody has subscribed to
pub const DEFAULT_BASELINE_WINDOW_MS: u64 = 300_000;
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 100;
pub const DUPLICATE_TIME_EPSILON_MS: i64 = 100;
pub const DUPLICATE_VALUE_EPSILON: f64 = 1e-3;
pub const HISTORY_MIN_ENTRIES: usize = 64;
pub const HISTORY_HARD_CAP: usize = 36_000;

// Diagnostics
pub const DIAGNOSTICS_CAPACITY: usize = 256;
