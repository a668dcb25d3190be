//! Record definitions - rocks and minerals with free-form attributes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::KnowledgeError;

/// Which catalog a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Mineral,
    Rock,
}

impl RecordKind {
    /// Both kinds in search order.
    pub const ALL: [RecordKind; 2] = [RecordKind::Mineral, RecordKind::Rock];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Mineral => "mineral",
            RecordKind::Rock => "rock",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attribute value: the schema is sparse and typed per record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Number(f64),
    Text(String),
}

impl AttributeValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            AttributeValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Number(_) => None,
            AttributeValue::Text(s) => Some(s),
        }
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeValue::Number(n) => write!(f, "{}", n),
            AttributeValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

/// A rock or mineral entry in the knowledge base.
///
/// Serialized as a flat JSON object: `{"name": "Quartz", "hardness": 7, ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Record {
    pub name: String,

    #[serde(flatten)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Record {
    /// Create a new record with no attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Catalog key: names are unique regardless of case.
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

impl TryFrom<Map<String, Value>> for Record {
    type Error = KnowledgeError;

    fn try_from(mut object: Map<String, Value>) -> Result<Self, Self::Error> {
        let name = match object.remove("name") {
            Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
            Some(other) => {
                return Err(KnowledgeError::InvalidRecord(format!(
                    "record name must be a non-empty string, got {other}"
                )))
            }
            None => {
                return Err(KnowledgeError::InvalidRecord(
                    "record is missing a name".into(),
                ))
            }
        };

        let mut attributes = BTreeMap::new();
        for (key, value) in object {
            match value {
                Value::Number(n) => match n.as_f64() {
                    Some(n) => {
                        attributes.insert(key, AttributeValue::Number(n));
                    }
                    None => tracing::debug!(
                        target: "geo::knowledge",
                        record = %name,
                        attribute = %key,
                        "Skipping number outside f64 range"
                    ),
                },
                Value::String(s) => {
                    attributes.insert(key, AttributeValue::Text(s));
                }
                other => tracing::debug!(
                    target: "geo::knowledge",
                    record = %name,
                    attribute = %key,
                    value = %other,
                    "Skipping non-scalar attribute"
                ),
            }
        }

        Ok(Self { name, attributes })
    }
}
