use std::collections::BTreeMap;
use std::fmt;

use ctr_core::errors::{CtrError, ErrorInfo};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

/// Closed set of shapes accepted by [`fingerprint`].
#[derive(Debug, Clone, PartialEq)]
pub enum Structure {
    /// Leaf value hashed by value.
    Scalar(Value),
    /// Ordered sequence; element order is significant.
    Seq(Vec<Structure>),
    /// Unordered collection; enumeration order is ignored.
    Set(Vec<Structure>),
    /// String keyed mapping; insertion order is ignored.
    Map(BTreeMap<String, Structure>),
}

impl Structure {
    /// Builds an unordered collection from any iterator of structures.
    pub fn set<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Structure>,
    {
        Structure::Set(items.into_iter().map(Into::into).collect())
    }

    fn encode(&self) -> Value {
        match self {
            Structure::Scalar(value) => json!(["val", value]),
            Structure::Seq(items) => {
                let encoded: Vec<Value> = items.iter().map(Structure::encode).collect();
                json!(["seq", encoded])
            }
            Structure::Set(items) => {
                let mut encoded: Vec<(String, Value)> = items
                    .iter()
                    .map(|item| {
                        let value = item.encode();
                        (value.to_string(), value)
                    })
                    .collect();
                encoded.sort_by(|a, b| a.0.cmp(&b.0));
                let members: Vec<Value> = encoded.into_iter().map(|(_, value)| value).collect();
                json!(["set", members])
            }
            Structure::Map(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    map.insert(key.clone(), value.encode());
                }
                json!(["map", Value::Object(map)])
            }
        }
    }
}

impl From<&Value> for Structure {
    fn from(value: &Value) -> Self {
        match value {
            Value::Array(items) => Structure::Seq(items.iter().map(Structure::from).collect()),
            Value::Object(entries) => Structure::Map(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), Structure::from(value)))
                    .collect(),
            ),
            scalar => Structure::Scalar(scalar.clone()),
        }
    }
}

impl From<Value> for Structure {
    fn from(value: Value) -> Self {
        Structure::from(&value)
    }
}

impl From<&str> for Structure {
    fn from(value: &str) -> Self {
        Structure::Scalar(Value::String(value.to_string()))
    }
}

impl From<&String> for Structure {
    fn from(value: &String) -> Self {
        Structure::from(value.as_str())
    }
}

impl From<&BTreeMap<String, Value>> for Structure {
    fn from(entries: &BTreeMap<String, Value>) -> Self {
        Structure::Map(
            entries
                .iter()
                .map(|(key, value)| (key.clone(), Structure::from(value)))
                .collect(),
        )
    }
}

/// Hex encoded SHA256 digest identifying a structure.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Returns the full hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns an abbreviated digest for display.
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes the order-stable structural digest of `value`.
pub fn fingerprint(value: &Structure) -> Fingerprint {
    let canonical = value.encode().to_string();
    let digest = Sha256::digest(canonical.as_bytes());
    Fingerprint(format!("{:x}", digest))
}

/// Fingerprint of a run: playbook path, sorted tags and merged variables.
pub fn run_fingerprint(
    playbook_path: &str,
    tags: &[String],
    vars: &BTreeMap<String, Value>,
) -> Fingerprint {
    let mut sorted_tags: Vec<&String> = tags.iter().collect();
    sorted_tags.sort();
    let structure = Structure::Seq(vec![
        Structure::from(playbook_path),
        Structure::Seq(sorted_tags.into_iter().map(Structure::from).collect()),
        Structure::from(vars),
    ]);
    fingerprint(&structure)
}

/// Computes a stable hexadecimal hash for the provided serializable payload.
///
/// The payload is lifted into a [`Structure`], so sequences keep their order
/// and objects hash independently of key order.
pub fn stable_hash_string<T: Serialize>(value: &T) -> Result<String, CtrError> {
    let value = serde_json::to_value(value).map_err(|err| {
        CtrError::Serde(ErrorInfo::new("serde.json_serialize", err.to_string()))
    })?;
    Ok(fingerprint(&Structure::from(&value)).0)
}
