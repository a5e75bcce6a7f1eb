//! Audit Log Records
//!
//! Value types for the records, envelopes and roots delivered by the log
//! service, together with the leaf hash computed over an envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::audit::canonical::{canonicalize_envelope, format_timestamp};

/// A single value inside an audit event.
///
/// Timestamps are kept as a distinct variant so that canonicalization can
/// render them in one fixed format regardless of how the caller built them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum EventValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Timestamp(DateTime<Utc>),
    Array(Vec<EventValue>),
    Object(BTreeMap<String, EventValue>),
}

impl From<Value> for EventValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => EventValue::Null,
            Value::Bool(b) => EventValue::Bool(b),
            Value::Number(n) => EventValue::Number(n),
            Value::String(s) => EventValue::String(s),
            Value::Array(items) => EventValue::Array(items.into_iter().map(EventValue::from).collect()),
            Value::Object(map) => EventValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, EventValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<EventValue> for Value {
    fn from(value: EventValue) -> Self {
        match value {
            EventValue::Null => Value::Null,
            EventValue::Bool(b) => Value::Bool(b),
            EventValue::Number(n) => Value::Number(n),
            EventValue::String(s) => Value::String(s),
            EventValue::Timestamp(ts) => Value::String(format_timestamp(&ts)),
            EventValue::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            EventValue::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for EventValue {
    fn from(value: &str) -> Self {
        EventValue::String(value.to_string())
    }
}

impl From<String> for EventValue {
    fn from(value: String) -> Self {
        EventValue::String(value)
    }
}

impl From<bool> for EventValue {
    fn from(value: bool) -> Self {
        EventValue::Bool(value)
    }
}

impl From<i64> for EventValue {
    fn from(value: i64) -> Self {
        EventValue::Number(value.into())
    }
}

impl From<DateTime<Utc>> for EventValue {
    fn from(value: DateTime<Utc>) -> Self {
        EventValue::Timestamp(value)
    }
}

/// The logged event: an arbitrary key/value mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event(BTreeMap<String, EventValue>);

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: &str, value: impl Into<EventValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<EventValue>) -> Option<EventValue> {
        self.0.insert(key.to_string(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&EventValue> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &EventValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, EventValue)> for Event {
    fn from_iter<I: IntoIterator<Item = (String, EventValue)>>(iter: I) -> Self {
        Event(iter.into_iter().collect())
    }
}

/// The signed and hashed unit of the audit log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: Event,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<String>,
    /// Any other fields the service included; they take part in the hash.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Envelope {
    pub fn new(event: Event) -> Self {
        Self {
            event,
            ..Self::default()
        }
    }

    pub fn with_received_at(mut self, received_at: &str) -> Self {
        self.received_at = Some(received_at.to_string());
        self
    }

    /// Calculate the SHA256 leaf hash of this envelope
    pub fn calculate_hash(&self) -> String {
        leaf_hash(self)
    }

    /// Verify a claimed leaf hash against this envelope
    pub fn verify_hash(&self, claimed_hash: &str) -> bool {
        verify_log_hash(self, claimed_hash)
    }
}

/// A log entry returned by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub hash: String,
    pub envelope: Envelope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub membership_proof: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_leaf_index",
        skip_serializing_if = "Option::is_none"
    )]
    pub leaf_index: Option<u64>,
    #[serde(default)]
    pub published: bool,
}

impl Record {
    pub fn summary(&self) -> String {
        format!(
            "leaf {} ({}published): {}",
            self.leaf_index
                .map(|idx| idx.to_string())
                .unwrap_or_else(|| "?".to_string()),
            if self.published { "" } else { "un" },
            self.hash
        )
    }
}

/// A tree root at a given size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Root {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_name: Option<String>,
    #[serde(default)]
    pub size: u64,
    pub root_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consistency_proof: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    /// Content address, set when the root was resolved from the external ledger
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

impl Root {
    pub fn new(size: u64, root_hash: &str) -> Self {
        Self {
            tree_name: None,
            size,
            root_hash: root_hash.to_string(),
            consistency_proof: None,
            url: None,
            published_at: None,
            transaction_id: None,
        }
    }

    pub fn with_consistency_proof(mut self, proof: Vec<String>) -> Self {
        self.consistency_proof = Some(proof);
        self
    }

    pub fn is_anchored(&self) -> bool {
        self.transaction_id.is_some()
    }
}

/// Roots keyed by tree size.
pub type PublishedRoots = BTreeMap<u64, Root>;

/// Response to a single log call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogResponse {
    #[serde(default)]
    pub hash: String,
    pub envelope: Envelope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unpublished_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub membership_proof: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consistency_proof: Option<Vec<String>>,
}

/// Response to a search call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub events: Vec<Record>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<Root>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unpublished_root: Option<Root>,
}

/// Compute the lowercase hex SHA256 leaf hash of an envelope
pub fn leaf_hash(envelope: &Envelope) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonicalize_envelope(envelope));
    hex::encode(hasher.finalize())
}

/// Check a claimed leaf hash against the envelope content
pub fn verify_log_hash(envelope: &Envelope, claimed_hash: &str) -> bool {
    leaf_hash(envelope).eq_ignore_ascii_case(claimed_hash.trim())
}

// The service has sent leaf indexes both as numbers and as decimal strings.
fn deserialize_leaf_index<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawIndex {
        Number(u64),
        Text(String),
    }

    match Option::<RawIndex>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawIndex::Number(idx)) => Ok(Some(idx)),
        Some(RawIndex::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
