//! File-backed sensor configuration store
//!
//! All sensors share one JSON object keyed `"<sensorType>.<instance>"`.
//! Reading happens asynchronously at startup; every write rewrites the
//! whole file through a temporary file and a rename.

use anyhow::{Context, Result};
use log::{debug, warn};
use marine_sens_core::{decode_record, ConfigProvider, ConfigStoreError};
use marine_sens_types::{SensorConfiguration, SensorKey, SerializationError};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

pub const SENSORS_FILE: &str = "sensors.json";

/// Read the raw records from disk
///
/// A missing file is an empty store. Individual records stay raw so a
/// corrupt one is only noticed when its sensor appears.
pub async fn read_records(path: &Path) -> Result<HashMap<String, Value>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No sensor configuration at {}", path.display());
            return Ok(HashMap::new());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        }
    };
    let records: HashMap<String, Value> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid sensor configuration in {}", path.display()))?;
    Ok(records)
}

/// [`ConfigProvider`] persisting to a JSON file
#[derive(Debug)]
pub struct FileConfigStore {
    path: PathBuf,
    ready: bool,
    records: HashMap<String, Value>,
}

impl FileConfigStore {
    /// Store at `path`, not ready until [`ConfigProvider::finish_loading`]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ready: false,
            records: HashMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn persist(&self) -> Result<(), ConfigStoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let sorted: BTreeMap<&String, &Value> = self.records.iter().collect();
        let content = serde_json::to_vec_pretty(&sorted).map_err(|source| SerializationError::Json {
            key: self.path.display().to_string(),
            source,
        })?;

        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);
        std::fs::write(&temp, content)?;
        std::fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

impl ConfigProvider for FileConfigStore {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn load(&self, key: &SensorKey) -> Result<Option<SensorConfiguration>, ConfigStoreError> {
        if !self.ready {
            return Err(ConfigStoreError::NotReady);
        }
        match self.records.get(&key.storage_key()) {
            Some(raw) => Ok(Some(decode_record(key, raw)?)),
            None => Ok(None),
        }
    }

    fn save(&mut self, key: &SensorKey, config: &SensorConfiguration) -> Result<(), ConfigStoreError> {
        if !self.ready {
            return Err(ConfigStoreError::NotReady);
        }
        let value = serde_json::to_value(config).map_err(|source| SerializationError::Json {
            key: key.storage_key(),
            source,
        })?;
        self.records.insert(key.storage_key(), value);
        self.persist()
    }

    fn remove(&mut self, key: &SensorKey) -> Result<(), ConfigStoreError> {
        if self.records.remove(&key.storage_key()).is_some() && self.ready {
            self.persist()?;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), ConfigStoreError> {
        self.records.clear();
        if self.ready {
            self.persist()?;
        }
        Ok(())
    }

    fn finish_loading(&mut self, records: HashMap<String, Value>) {
        for (key, value) in records {
            if SensorKey::from_storage_key(&key).is_none() {
                warn!("Ignoring sensor configuration with unknown key '{}'", key);
                continue;
            }
            self.records.entry(key).or_insert(value);
        }
        self.ready = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marine_sens_types::{SensorType, Thresholds};
    use serde_json::json;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("marine-sens-{}", uuid::Uuid::new_v4()))
            .join(SENSORS_FILE)
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let records = read_records(&temp_path()).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_write_through_and_reload() {
        let path = temp_path();
        let key = SensorKey::new(SensorType::Battery, 0);
        let mut config = SensorConfiguration::default();
        config.metrics.insert("voltage".into(), Thresholds::below(11.5, 12.0));

        let mut store = FileConfigStore::new(&path);
        assert!(matches!(store.save(&key, &config), Err(ConfigStoreError::NotReady)));
        store.finish_loading(HashMap::new());
        store.save(&key, &config).unwrap();

        let mut reloaded = FileConfigStore::new(&path);
        reloaded.finish_loading(read_records(&path).await.unwrap());
        assert_eq!(reloaded.load(&key).unwrap(), Some(config));

        reloaded.clear().unwrap();
        assert!(read_records(&path).await.unwrap().is_empty());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_file_reported() {
        let path = temp_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();
        assert!(read_records(&path).await.is_err());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_unknown_keys_dropped_on_load() {
        let mut store = FileConfigStore::new(temp_path());
        let mut records = HashMap::new();
        records.insert("depth.0".to_string(), json!({"name": "Bow"}));
        records.insert("toaster.1".to_string(), json!({}));
        store.finish_loading(records);
        assert_eq!(store.len(), 1);
    }
}
