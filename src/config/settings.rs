//! Application configuration

use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use log::info;
use marine_sens_core::constants::{
    ALARM_LATENCY_CEILING_MS, DEFAULT_ALARM_MAX_LATENCY_MS, DEFAULT_ALARM_QUIET_MS,
    DEFAULT_ENRICHMENT_DEBOUNCE_MS, DEFAULT_STALE_AFTER_MS, ENRICHMENT_DEBOUNCE_CEILING_MS,
};
use marine_sens_types::PresentationConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::{HistoryConfig, RegistryConfig};
use crate::decoders::TalkerTable;

/// Application-wide configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Unit region, per-category overrides and timezone
    pub presentation: PresentationConfig,
    pub history: HistoryConfig,
    pub alarms: AlarmSettings,
    pub enrichment: EnrichmentSettings,
    /// Talker id to instance, on top of the built-in talkers
    pub talkers: BTreeMap<String, u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlarmSettings {
    /// Quiet period after the last update before alarms are evaluated
    pub quiet_ms: u64,
    /// Longest an alarm evaluation may be postponed under constant updates
    pub max_latency_ms: u64,
    pub stale_after_ms: u64,
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            quiet_ms: DEFAULT_ALARM_QUIET_MS,
            max_latency_ms: DEFAULT_ALARM_MAX_LATENCY_MS,
            stale_after_ms: DEFAULT_STALE_AFTER_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnrichmentSettings {
    pub debounce_ms: u64,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_ENRICHMENT_DEBOUNCE_MS,
        }
    }
}

impl AppConfig {
    /// Load configuration from disk
    ///
    /// A missing file gives the defaults.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            info!("No configuration at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }

        Self::load_from_path(&config_path)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    /// Directory holding the application and sensor configuration files
    pub fn config_dir() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("com", "marine-sens", "marine-sens")
            .context("Could not determine config directory")?;

        Ok(dirs.config_dir().to_path_buf())
    }

    /// Get the configuration file path
    fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load configuration from a specific file path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific file path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Reject timing settings outside their hard limits
    pub fn validate(&self) -> Result<()> {
        if self.alarms.max_latency_ms > ALARM_LATENCY_CEILING_MS {
            bail!(
                "alarms.maxLatencyMs = {} exceeds {} ms",
                self.alarms.max_latency_ms,
                ALARM_LATENCY_CEILING_MS
            );
        }
        if self.alarms.quiet_ms > self.alarms.max_latency_ms {
            bail!(
                "alarms.quietMs = {} is longer than alarms.maxLatencyMs = {}",
                self.alarms.quiet_ms,
                self.alarms.max_latency_ms
            );
        }
        if self.enrichment.debounce_ms > ENRICHMENT_DEBOUNCE_CEILING_MS {
            bail!(
                "enrichment.debounceMs = {} exceeds {} ms",
                self.enrichment.debounce_ms,
                ENRICHMENT_DEBOUNCE_CEILING_MS
            );
        }
        if self.history.prune_interval_ms == 0 {
            bail!("history.pruneIntervalMs must be positive");
        }
        if let Some(timezone) = &self.presentation.timezone {
            timezone
                .parse::<Tz>()
                .map_err(|e| anyhow::anyhow!("Unknown timezone '{}': {}", timezone, e))?;
        }
        Ok(())
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            alarm_quiet_ms: self.alarms.quiet_ms,
            alarm_max_latency_ms: self.alarms.max_latency_ms,
            stale_after_ms: self.alarms.stale_after_ms,
            history: self.history,
        }
    }

    /// Built-in talkers plus the configured ones
    pub fn talker_table(&self) -> TalkerTable {
        let mut table = TalkerTable::default();
        table.extend(&self.talkers);
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marine_sens_types::UnitRegion;
    use serde_json::json;

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: AppConfig = serde_json::from_value(json!({
            "presentation": {"region": "nauticalUs"},
            "alarms": {"staleAfterMs": 3000},
            "talkers": {"S2": 1}
        }))
        .unwrap();
        assert_eq!(config.presentation.region, UnitRegion::NauticalUs);
        assert_eq!(config.alarms.stale_after_ms, 3000);
        assert_eq!(config.alarms.quiet_ms, DEFAULT_ALARM_QUIET_MS);
        assert_eq!(config.history, HistoryConfig::default());
        assert_eq!(config.talker_table().get("S2"), Some(1));
        assert_eq!(config.talker_table().get("GP"), Some(0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_latency_ceiling_enforced() {
        let mut config = AppConfig::default();
        config.alarms.max_latency_ms = 6_000;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.enrichment.debounce_ms = 250;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_timezone_rejected() {
        let mut config = AppConfig::default();
        config.presentation.timezone = Some("Atlantis/Lost".to_string());
        assert!(config.validate().is_err());
        config.presentation.timezone = Some("America/New_York".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load_path() {
        let path = std::env::temp_dir()
            .join(format!("marine-sens-{}", uuid::Uuid::new_v4()))
            .join("config.json");
        let mut config = AppConfig::default();
        config.presentation.region = UnitRegion::Imperial;
        config.save_to_path(&path).unwrap();
        let loaded = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_registry_config_mirrors_sections() {
        let mut config = AppConfig::default();
        config.alarms.quiet_ms = 100;
        let registry = config.registry_config();
        assert_eq!(registry.alarm_quiet_ms, 100);
        assert_eq!(registry.history, config.history);
    }
}
