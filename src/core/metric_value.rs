//! Metric values: canonical value plus derived display form
//!
//! The canonical value and its category never change after construction.
//! Everything a display needs is derived from them and the active
//! presentation, so it can be thrown away and recomputed at any time.

use super::alarm::AlarmEvaluator;
use marine_sens_core::constants::NO_DATA;
use marine_sens_core::{ConversionRegistry, Presentation};
use marine_sens_types::{AlarmLevel, DataCategory, FieldValue, PresentationConfig, Thresholds};
use serde::Serialize;
use std::cell::Cell;

/// Display form of a value under one presentation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayFields {
    /// Converted number; `None` for text
    pub display_value: Option<f64>,
    pub unit: String,
    pub formatted_value: String,
    pub formatted_value_with_unit: String,
}

impl DisplayFields {
    fn from_presentation(presentation: &Presentation, si: f64) -> Self {
        let display_value = presentation.convert(si);
        let formatted_value = presentation.format_value(display_value);
        let formatted_value_with_unit = if formatted_value == NO_DATA {
            formatted_value.clone()
        } else {
            presentation.with_unit(&formatted_value)
        };
        Self {
            display_value: Some(display_value),
            unit: presentation.unit.to_string(),
            formatted_value,
            formatted_value_with_unit,
        }
    }

    fn text(text: &str) -> Self {
        Self {
            display_value: None,
            unit: String::new(),
            formatted_value: text.to_string(),
            formatted_value_with_unit: text.to_string(),
        }
    }

    /// Shown for metrics that have never been enriched
    pub fn no_data() -> Self {
        Self::text(NO_DATA)
    }
}

/// One metric reading
#[derive(Debug, Clone)]
pub struct MetricValue {
    si_value: FieldValue,
    category: DataCategory,
    timestamp: i64,
    display: Option<DisplayFields>,
    /// (thresholds version, level) of the last alarm evaluation
    alarm_cache: Cell<Option<(u64, AlarmLevel)>>,
}

impl MetricValue {
    pub fn new(si_value: FieldValue, category: DataCategory, timestamp: i64) -> Self {
        Self {
            si_value,
            category,
            timestamp,
            display: None,
            alarm_cache: Cell::new(None),
        }
    }

    pub fn number(si_value: f64, category: DataCategory, timestamp: i64) -> Self {
        Self::new(FieldValue::Number(si_value), category, timestamp)
    }

    pub fn si_value(&self) -> &FieldValue {
        &self.si_value
    }

    /// Canonical number, if this metric is numeric
    pub fn as_f64(&self) -> Option<f64> {
        self.si_value.as_f64()
    }

    pub fn category(&self) -> DataCategory {
        self.category
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Derive display fields from the active presentation
    ///
    /// Pure in `(si_value, category, presentation)`: calling it again with
    /// the same inputs yields the same fields.
    pub fn enrich(&mut self, conversions: &ConversionRegistry, presentation: &PresentationConfig) {
        self.display = Some(match &self.si_value {
            FieldValue::Number(si) => self.convert_to_display(*si, conversions, presentation),
            FieldValue::Text(text) => DisplayFields::text(text),
        });
    }

    /// Present an arbitrary canonical value exactly like this metric
    pub fn convert_to_display(
        &self,
        raw_si: f64,
        conversions: &ConversionRegistry,
        presentation: &PresentationConfig,
    ) -> DisplayFields {
        let presentation = conversions.resolve(self.category, presentation);
        DisplayFields::from_presentation(presentation, raw_si)
    }

    /// A sibling value (same category) already presented like this one
    pub fn derive(
        &self,
        raw_si: f64,
        timestamp: i64,
        conversions: &ConversionRegistry,
        presentation: &PresentationConfig,
    ) -> MetricValue {
        let mut derived = MetricValue::number(raw_si, self.category, timestamp);
        derived.display = Some(self.convert_to_display(raw_si, conversions, presentation));
        derived
    }

    /// Same value with display fields supplied by the caller
    pub(crate) fn with_display(mut self, display: DisplayFields) -> Self {
        self.display = Some(display);
        self
    }

    pub fn display(&self) -> Option<&DisplayFields> {
        self.display.as_ref()
    }

    pub fn is_enriched(&self) -> bool {
        self.display.is_some()
    }

    pub fn display_value(&self) -> Option<f64> {
        self.display.as_ref().and_then(|d| d.display_value)
    }

    pub fn unit(&self) -> &str {
        self.display.as_ref().map_or("", |d| d.unit.as_str())
    }

    pub fn formatted_value(&self) -> &str {
        self.display.as_ref().map_or(NO_DATA, |d| d.formatted_value.as_str())
    }

    pub fn formatted_value_with_unit(&self) -> &str {
        self.display
            .as_ref()
            .map_or(NO_DATA, |d| d.formatted_value_with_unit.as_str())
    }

    /// Alarm level of this value under `thresholds`
    pub fn get_alarm_state(&self, thresholds: &Thresholds) -> AlarmLevel {
        match self.si_value {
            FieldValue::Number(value) => AlarmEvaluator::evaluate(value, thresholds),
            FieldValue::Text(_) => AlarmLevel::Normal,
        }
    }

    /// Alarm level, reusing the previous result while `version` is unchanged
    ///
    /// The caller bumps `version` whenever the thresholds change; a new
    /// value always arrives as a new `MetricValue` with an empty cache.
    pub fn cached_alarm_state(&self, version: u64, thresholds: &Thresholds) -> AlarmLevel {
        if let Some((cached_version, level)) = self.alarm_cache.get() {
            if cached_version == version {
                return level;
            }
        }
        let level = self.get_alarm_state(thresholds);
        self.alarm_cache.set(Some((version, level)));
        level
    }

    /// Whether the canonical value differs from `other`
    pub fn value_differs(&self, other: &FieldValue) -> bool {
        &self.si_value != other
    }
}
