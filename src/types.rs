//! Shared record types.
//!
//! These types flow between the stores, the gallery builder, and the CLI.
//! They serialize to the same flat JSON shape the table service uses for an
//! entity: `PartitionKey`, `RowKey`, then one key per attribute.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute name under which a record's content reference is persisted.
pub const CONTENT_REF_FIELD: &str = "blob_path";

/// A scalar attribute value.
///
/// Variant order matters for untagged deserialization: booleans and integers
/// are tried before floats so `2020` stays an integer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// One catalog entry: a car on the lot.
///
/// The attribute schema is not fixed. Attributes live in a sorted map so two
/// serializations of the same record are byte-identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Coarse grouping (the vehicle category, e.g. `SUV`).
    #[serde(rename = "PartitionKey")]
    pub partition_key: String,
    /// Unique within the partition (e.g. `CAR001`).
    #[serde(rename = "RowKey")]
    pub row_key: String,
    /// `<container>/<name>` path of the item's image, if it has one.
    #[serde(rename = "blob_path", default, skip_serializing_if = "Option::is_none")]
    pub content_ref: Option<String>,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

impl ItemRecord {
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            content_ref: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Builder-style content reference setter.
    pub fn with_content_ref(mut self, reference: impl Into<String>) -> Self {
        self.content_ref = Some(reference.into());
        self
    }

    /// Look up a field by name, including the keys and the content reference.
    ///
    /// `PartitionKey`/`partition_key` and `RowKey`/`row_key` both resolve to
    /// the keys, so filter expressions and caption templates can share a
    /// vocabulary.
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "PartitionKey" | "partition_key" => Some(Value::Str(self.partition_key.clone())),
            "RowKey" | "row_key" => Some(Value::Str(self.row_key.clone())),
            CONTENT_REF_FIELD => self.content_ref.clone().map(Value::Str),
            _ => self.attributes.get(name).cloned(),
        }
    }

    /// `(partition key, row key)`, the identity the table service sorts by.
    pub fn key(&self) -> (&str, &str) {
        (&self.partition_key, &self.row_key)
    }
}
