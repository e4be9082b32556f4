//! Message decoding: `ParsedMessage` in, per-sensor field updates out
//!
//! Decoders are plain functions registered by NMEA 0183 sentence id or
//! NMEA 2000 PGN. Every decoder is all-or-nothing: it either returns all
//! of its updates or every validation error it found.

mod nmea0183;
mod nmea2000;
mod talker;
mod validation;

pub use talker::TalkerTable;
pub use validation::{FieldReader, Range, ValidationError};

use log::{debug, trace, warn};
use marine_sens_core::constants::DIAGNOSTICS_CAPACITY;
use marine_sens_types::{FieldUpdate, ParsedMessage, SensorData, SensorType};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Everything a decoder gets to see
pub struct DecodeContext<'a> {
    pub msg: &'a ParsedMessage,
    /// Sentence id or `PGN<n>`
    pub kind: &'a str,
    /// Instance resolved from the talker id
    pub instance: u8,
}

impl<'a> DecodeContext<'a> {
    pub fn reader(&self) -> FieldReader<'a> {
        FieldReader::new(self.msg)
    }

    pub fn update(&self, sensor_type: SensorType, data: SensorData) -> FieldUpdate {
        FieldUpdate::new(sensor_type, self.instance, data)
    }
}

pub type DecodeResult = Result<Vec<FieldUpdate>, Vec<ValidationError>>;

/// Function that decodes one message type
pub type DecodeFn = fn(&DecodeContext) -> DecodeResult;

/// Outcome of processing one message
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResult {
    pub success: bool,
    pub updates: Vec<FieldUpdate>,
    pub errors: Vec<String>,
}

impl ProcessResult {
    fn ok(updates: Vec<FieldUpdate>) -> Self {
        Self {
            success: true,
            updates,
            errors: Vec::new(),
        }
    }

    fn failed(errors: Vec<String>) -> Self {
        Self {
            success: false,
            updates: Vec::new(),
            errors,
        }
    }
}

/// One unsupported message seen
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsupportedEntry {
    pub message_type: String,
    pub timestamp: i64,
}

/// Record of messages that arrive but have no decoder
///
/// Keeps the most recent entries plus a running count per type.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    recent: VecDeque<UnsupportedEntry>,
    counts: BTreeMap<String, u64>,
    total: u64,
}

impl Diagnostics {
    fn record(&mut self, message_type: &str, timestamp: i64) {
        if self.recent.len() == DIAGNOSTICS_CAPACITY {
            self.recent.pop_front();
        }
        self.recent.push_back(UnsupportedEntry {
            message_type: message_type.to_string(),
            timestamp,
        });
        *self.counts.entry(message_type.to_string()).or_insert(0) += 1;
        self.total += 1;
    }

    pub fn recent(&self) -> impl Iterator<Item = &UnsupportedEntry> {
        self.recent.iter()
    }

    pub fn count_for(&self, message_type: &str) -> u64 {
        self.counts.get(message_type).copied().unwrap_or(0)
    }

    /// Per-type counts, sorted by type
    pub fn counts(&self) -> &BTreeMap<String, u64> {
        &self.counts
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

/// How a message type string was understood
#[derive(Debug, Clone, PartialEq)]
enum MessageKind {
    Sentence { talker: Option<String>, id: String },
    Pgn(u32),
}

fn classify(message_type: &str, msg: &ParsedMessage) -> Option<MessageKind> {
    let trimmed = message_type
        .trim()
        .trim_start_matches(|c: char| c == '$' || c == '!')
        .to_ascii_uppercase();

    if let Some(number) = trimmed.strip_prefix("PGN") {
        return number.parse().ok().map(MessageKind::Pgn);
    }
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        return trimmed.parse().ok().map(MessageKind::Pgn);
    }
    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    match trimmed.len() {
        5 => Some(MessageKind::Sentence {
            talker: Some(trimmed[..2].to_string()),
            id: trimmed[2..].to_string(),
        }),
        3 => {
            let talker = ["talker", "talkerId"].iter().find_map(|key| {
                msg.fields
                    .get(*key)
                    .and_then(|v| v.as_str())
                    .map(|s| s.trim().to_ascii_uppercase())
                    .filter(|s| !s.is_empty())
            });
            Some(MessageKind::Sentence {
                talker,
                id: trimmed,
            })
        }
        _ => None,
    }
}

/// Turns parsed messages into sensor field updates
pub struct MessageProcessor {
    sentences: HashMap<&'static str, DecodeFn>,
    pgns: HashMap<u32, DecodeFn>,
    talkers: TalkerTable,
    diagnostics: Diagnostics,
}

impl MessageProcessor {
    /// Processor with every built-in decoder registered
    pub fn new(talkers: TalkerTable) -> Self {
        let mut processor = Self::empty(talkers);
        nmea0183::register_all(&mut processor);
        nmea2000::register_all(&mut processor);
        processor
    }

    /// Processor without any decoders
    pub fn empty(talkers: TalkerTable) -> Self {
        Self {
            sentences: HashMap::new(),
            pgns: HashMap::new(),
            talkers,
            diagnostics: Diagnostics::default(),
        }
    }

    /// Register an NMEA 0183 sentence decoder
    pub fn register_sentence(&mut self, id: &'static str, decoder: DecodeFn) {
        self.sentences.insert(id, decoder);
    }

    /// Register an NMEA 2000 PGN decoder
    pub fn register_pgn(&mut self, pgn: u32, decoder: DecodeFn) {
        self.pgns.insert(pgn, decoder);
    }

    /// Supported sentence ids, sorted
    pub fn list_sentences(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.sentences.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Supported PGNs, sorted
    pub fn list_pgns(&self) -> Vec<u32> {
        let mut pgns: Vec<_> = self.pgns.keys().copied().collect();
        pgns.sort_unstable();
        pgns
    }

    pub fn talkers(&self) -> &TalkerTable {
        &self.talkers
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Decode one message
    ///
    /// Never panics and never applies part of a message: on any validation
    /// error the result carries no updates.
    pub fn process(&mut self, msg: &ParsedMessage) -> ProcessResult {
        let resolved = match classify(&msg.message_type, msg) {
            Some(MessageKind::Sentence { talker, id }) => self
                .sentences
                .get(id.as_str())
                .map(|decoder| (*decoder, id, self.talkers.resolve(talker.as_deref()))),
            Some(MessageKind::Pgn(pgn)) => self
                .pgns
                .get(&pgn)
                .map(|decoder| (*decoder, format!("PGN{}", pgn), 0)),
            None => None,
        };

        let Some((decoder, kind, instance)) = resolved else {
            return self.unsupported(msg);
        };

        let ctx = DecodeContext {
            msg,
            kind: &kind,
            instance,
        };
        match decoder(&ctx) {
            Ok(updates) => {
                trace!("{} -> {} updates", msg.message_type, updates.len());
                ProcessResult::ok(updates.into_iter().filter(|u| !u.data.is_empty()).collect())
            }
            Err(errors) => {
                debug!(
                    "Rejected {}: {}",
                    msg.message_type,
                    errors
                        .iter()
                        .map(|e| e.to_string())
                        .collect::<Vec<_>>()
                        .join("; ")
                );
                ProcessResult::failed(errors.iter().map(|e| e.to_string()).collect())
            }
        }
    }

    fn unsupported(&mut self, msg: &ParsedMessage) -> ProcessResult {
        warn!(target: "marine_sens::unsupported", "Unsupported message type: {}", msg.message_type);
        self.diagnostics.record(&msg.message_type, msg.timestamp);
        ProcessResult::failed(vec![format!(
            "Unsupported message type: {}",
            msg.message_type
        )])
    }
}

impl Default for MessageProcessor {
    fn default() -> Self {
        Self::new(TalkerTable::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marine_sens_types::FieldValue;

    #[test]
    fn test_unsupported_type_reported_once() {
        let mut processor = MessageProcessor::default();
        let msg = ParsedMessage::new("GPXYZ", 42);
        let result = processor.process(&msg);
        assert!(!result.success);
        assert!(result.updates.is_empty());
        assert_eq!(result.errors, vec!["Unsupported message type: GPXYZ".to_string()]);
        assert_eq!(processor.diagnostics().total(), 1);
        assert_eq!(processor.diagnostics().count_for("GPXYZ"), 1);
        let entry = processor.diagnostics().recent().next().unwrap();
        assert_eq!(entry.timestamp, 42);
    }

    #[test]
    fn test_diagnostics_bounded() {
        let mut processor = MessageProcessor::default();
        for i in 0..(DIAGNOSTICS_CAPACITY + 10) {
            processor.process(&ParsedMessage::new("PGN1", i as i64));
        }
        assert_eq!(processor.diagnostics().recent().count(), DIAGNOSTICS_CAPACITY);
        assert_eq!(processor.diagnostics().count_for("PGN1"), DIAGNOSTICS_CAPACITY as u64 + 10);
    }

    #[test]
    fn test_message_type_forms() {
        let mut processor = MessageProcessor::default();
        for message_type in ["$SDDPT", "SDDPT", "sddpt", "DPT"] {
            let msg = ParsedMessage::new(message_type, 0).with("depth", 3.0);
            let result = processor.process(&msg);
            assert!(result.success, "{}", message_type);
            assert_eq!(result.updates[0].sensor_type, SensorType::Depth);
        }
        for message_type in ["PGN128267", "128267"] {
            let msg = ParsedMessage::new(message_type, 0).with("depth", 3.0);
            assert!(processor.process(&msg).success, "{}", message_type);
        }
        assert_eq!(processor.diagnostics().total(), 0);
    }

    #[test]
    fn test_instance_from_talker() {
        let mut processor = MessageProcessor::new(TalkerTable::default().with("S2", 1));
        let result = processor.process(&ParsedMessage::new("S2DPT", 0).with("depth", 3.0));
        assert_eq!(result.updates[0].instance, 1);
        let result = processor.process(
            &ParsedMessage::new("DPT", 0)
                .with("depth", 3.0)
                .with("talker", "S2"),
        );
        assert_eq!(result.updates[0].instance, 1);
        let result = processor.process(&ParsedMessage::new("QQDPT", 0).with("depth", 3.0));
        assert_eq!(result.updates[0].instance, 0);
    }

    #[test]
    fn test_invalid_message_has_no_updates() {
        let mut processor = MessageProcessor::default();
        let mut msg = ParsedMessage::new("IIMDA", 0)
            .with("airTemperature", 21.0)
            .with("relativeHumidity", 140.0);
        msg.fields.insert("dewPoint".into(), FieldValue::Number(f64::INFINITY));
        let result = processor.process(&msg);
        assert!(!result.success);
        assert!(result.updates.is_empty());
        assert_eq!(result.errors.len(), 2);
        assert_eq!(processor.diagnostics().total(), 0);
    }

    #[test]
    fn test_builtin_decoders_registered() {
        let processor = MessageProcessor::default();
        let sentences = processor.list_sentences();
        for id in ["DPT", "DBT", "RMC", "GGA", "MWV", "XDR", "RPM", "APB", "XTE", "RMB", "BWC"] {
            assert!(sentences.contains(&id), "{}", id);
        }
        let pgns = processor.list_pgns();
        for pgn in [127_508, 127_505, 127_489, 128_267, 130_306, 129_025, 127_250] {
            assert!(pgns.contains(&pgn), "{}", pgn);
        }
    }
}
