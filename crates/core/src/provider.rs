//! Persisted sensor configuration contract
//!
//! The registry receives a [`ConfigProvider`] at construction. The provider
//! may still be loading when the first data arrives; `is_ready` tells the
//! registry whether persisted configuration can be trusted yet.

use marine_sens_types::{SensorConfiguration, SensorKey, SerializationError};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigStoreError {
    #[error("configuration store has not finished loading")]
    NotReady,

    #[error("configuration store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

/// Source and sink of persisted [`SensorConfiguration`] records
pub trait ConfigProvider {
    /// Whether loading has completed
    fn is_ready(&self) -> bool;

    /// Persisted configuration for one sensor, if any
    fn load(&self, key: &SensorKey) -> Result<Option<SensorConfiguration>, ConfigStoreError>;

    /// Write one sensor's configuration through to storage
    fn save(&mut self, key: &SensorKey, config: &SensorConfiguration)
        -> Result<(), ConfigStoreError>;

    /// Forget one sensor's configuration
    fn remove(&mut self, key: &SensorKey) -> Result<(), ConfigStoreError>;

    /// Forget every stored configuration
    fn clear(&mut self) -> Result<(), ConfigStoreError>;

    /// Install records read by an asynchronous loader and become ready
    ///
    /// Records saved while loading win over loaded ones for the same key.
    fn finish_loading(&mut self, records: HashMap<String, Value>);
}

/// Decode one raw record, attributing failures to its key
pub fn decode_record(key: &SensorKey, raw: &Value) -> Result<SensorConfiguration, SerializationError> {
    serde_json::from_value(raw.clone()).map_err(|source| SerializationError::Json {
        key: key.storage_key(),
        source,
    })
}

/// In-memory provider holding raw JSON records
///
/// Records stay raw until requested so one corrupt entry only affects its
/// own sensor.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    ready: bool,
    records: HashMap<String, Value>,
    saves: usize,
}

impl MemoryConfigStore {
    /// A store that is already loaded and empty
    pub fn new() -> Self {
        Self {
            ready: true,
            ..Default::default()
        }
    }

    /// A store that is still loading
    pub fn pending() -> Self {
        Self::default()
    }

    /// Seed a record, valid or not
    pub fn insert_raw(&mut self, key: &SensorKey, value: Value) {
        self.records.insert(key.storage_key(), value);
    }

    pub fn get(&self, key: &SensorKey) -> Option<SensorConfiguration> {
        self.records
            .get(&key.storage_key())
            .and_then(|raw| decode_record(key, raw).ok())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of successful writes
    pub fn save_count(&self) -> usize {
        self.saves
    }

    pub fn records(&self) -> &HashMap<String, Value> {
        &self.records
    }
}

impl ConfigProvider for MemoryConfigStore {
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

    fn save(
        &mut self,
        key: &SensorKey,
        config: &SensorConfiguration,
    ) -> Result<(), ConfigStoreError> {
        if !self.ready {
            return Err(ConfigStoreError::NotReady);
        }
        let value = serde_json::to_value(config).map_err(|source| SerializationError::Json {
            key: key.storage_key(),
            source,
        })?;
        self.records.insert(key.storage_key(), value);
        self.saves += 1;
        Ok(())
    }

    fn remove(&mut self, key: &SensorKey) -> Result<(), ConfigStoreError> {
        self.records.remove(&key.storage_key());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), ConfigStoreError> {
        self.records.clear();
        Ok(())
    }

    fn finish_loading(&mut self, records: HashMap<String, Value>) {
        for (key, value) in records {
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

    #[test]
    fn test_pending_store_refuses_io() {
        let mut store = MemoryConfigStore::pending();
        let key = SensorKey::new(SensorType::Battery, 0);
        assert!(!store.is_ready());
        assert!(matches!(store.load(&key), Err(ConfigStoreError::NotReady)));
        assert!(matches!(
            store.save(&key, &SensorConfiguration::default()),
            Err(ConfigStoreError::NotReady)
        ));
        store.finish_loading(HashMap::new());
        assert!(store.load(&key).unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let mut store = MemoryConfigStore::new();
        let key = SensorKey::new(SensorType::Battery, 1);
        let mut config = SensorConfiguration::default();
        config.metrics.insert("voltage".into(), Thresholds::below(10.5, 11.0));
        store.save(&key, &config).unwrap();
        assert_eq!(store.load(&key).unwrap(), Some(config));
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn test_corrupt_record_isolated() {
        let mut store = MemoryConfigStore::new();
        let bad = SensorKey::new(SensorType::Tank, 0);
        let good = SensorKey::new(SensorType::Tank, 1);
        store.insert_raw(&bad, json!({"metrics": "not a map"}));
        store.insert_raw(&good, json!({"name": "Diesel"}));
        assert!(matches!(
            store.load(&bad),
            Err(ConfigStoreError::Serialization(_))
        ));
        assert_eq!(
            store.load(&good).unwrap().and_then(|c| c.name),
            Some("Diesel".to_string())
        );
    }
}
