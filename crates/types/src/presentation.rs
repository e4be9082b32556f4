//! User presentation preferences

use crate::category::{DataCategory, UnitRegion};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Global display preferences applied to every metric
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationConfig {
    #[serde(default)]
    pub region: UnitRegion,
    /// Per-category presentation chosen explicitly by the user, by id
    #[serde(default)]
    pub overrides: BTreeMap<DataCategory, String>,
    /// IANA timezone for local date/time views (e.g. `Europe/Berlin`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl PresentationConfig {
    pub fn for_region(region: UnitRegion) -> Self {
        Self {
            region,
            ..Default::default()
        }
    }

    pub fn with_override(mut self, category: DataCategory, presentation_id: &str) -> Self {
        self.overrides.insert(category, presentation_id.to_string());
        self
    }
}

/// One recorded sample of a metric's history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub value: f64,
    pub timestamp: i64,
}
