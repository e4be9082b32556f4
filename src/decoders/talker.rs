//! Talker id to sensor instance mapping

use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Talkers every installation is assumed to have, all on instance 0
const DEFAULT_TALKERS: &[&str] = &[
    "AG", "AI", "AP", "EC", "GA", "GB", "GL", "GN", "GP", "HC", "HE", "HN", "II", "IN", "SD",
    "SN", "SS", "TI", "VD", "VM", "VW", "WI", "YX", "ER",
];

/// Resolves the instance number for NMEA 0183 sentences
///
/// Unknown talkers fall back to instance 0 and are logged once each, so two
/// unconfigured devices of the same type end up sharing an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TalkerTable {
    instances: BTreeMap<String, u8>,
    #[serde(skip)]
    warned: HashSet<String>,
}

impl Default for TalkerTable {
    fn default() -> Self {
        Self {
            instances: DEFAULT_TALKERS.iter().map(|t| (t.to_string(), 0)).collect(),
            warned: HashSet::new(),
        }
    }
}

impl TalkerTable {
    /// Table with no entries at all
    pub fn empty() -> Self {
        Self {
            instances: BTreeMap::new(),
            warned: HashSet::new(),
        }
    }

    pub fn with(mut self, talker: &str, instance: u8) -> Self {
        self.insert(talker, instance);
        self
    }

    pub fn insert(&mut self, talker: &str, instance: u8) {
        self.instances.insert(talker.to_ascii_uppercase(), instance);
    }

    /// Add entries from configuration, replacing defaults with the same id
    pub fn extend<'a>(&mut self, entries: impl IntoIterator<Item = (&'a String, &'a u8)>) {
        for (talker, instance) in entries {
            self.insert(talker, *instance);
        }
    }

    pub fn get(&self, talker: &str) -> Option<u8> {
        self.instances.get(&talker.to_ascii_uppercase()).copied()
    }

    /// Instance for `talker`, defaulting unknown ones to 0
    pub fn resolve(&mut self, talker: Option<&str>) -> u8 {
        let Some(talker) = talker else {
            return 0;
        };
        if let Some(instance) = self.get(talker) {
            return instance;
        }
        let talker = talker.to_ascii_uppercase();
        if self.warned.insert(talker.clone()) {
            warn!(
                "Unknown talker id '{}', using instance 0; add it to the talker table to separate devices",
                talker
            );
        }
        0
    }

    /// Talkers seen without an entry
    pub fn unknown_seen(&self) -> impl Iterator<Item = &str> {
        self.warned.iter().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_unknown_talkers() {
        let mut table = TalkerTable::default().with("s2", 1);
        assert_eq!(table.resolve(Some("SD")), 0);
        assert_eq!(table.resolve(Some("S2")), 1);
        assert_eq!(table.resolve(Some("ZZ")), 0);
        assert_eq!(table.resolve(Some("zz")), 0);
        assert_eq!(table.unknown_seen().count(), 1);
        assert_eq!(table.resolve(None), 0);
    }

    #[test]
    fn test_config_json() {
        let table: TalkerTable = serde_json::from_str(r#"{"GP": 0, "G2": 2}"#).unwrap();
        assert_eq!(table.get("G2"), Some(2));
        assert_eq!(table.get("SD"), None);
    }
}
