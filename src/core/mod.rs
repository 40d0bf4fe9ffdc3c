//! Core value types shared by the document model and the editing engine.
//!
//! - [`BlockKey`] - Opaque block identifiers, stable across snapshots
//! - [`EntityKey`] - Monotonically allocated entity identifiers
//! - [`DataValue`] and [`DataMap`] - Open attribute maps for blocks and entities
//! - [`InlineStyle`] and [`CharMeta`] - Per-character formatting

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

pub mod style;

pub use style::{CharMeta, InlineStyle, StyleRange, StyleSet, StyleSpan};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockKey(Uuid);

impl BlockKey {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BlockKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form, enough to tell blocks apart in logs.
        let simple = self.0.simple().to_string();
        f.write_str(&simple[..8])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(pub u64);

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    Bool(bool),
    Int(i64),
    String(String),
}

impl DataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DataValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            DataValue::Int(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        DataValue::String(value.to_string())
    }
}

impl From<String> for DataValue {
    fn from(value: String) -> Self {
        DataValue::String(value)
    }
}

impl From<bool> for DataValue {
    fn from(value: bool) -> Self {
        DataValue::Bool(value)
    }
}

impl From<i64> for DataValue {
    fn from(value: i64) -> Self {
        DataValue::Int(value)
    }
}

pub type DataMap = BTreeMap<String, DataValue>;

/// Builds a [`DataMap`] from key/value pairs.
pub fn data_map<K, V, I>(pairs: I) -> DataMap
where
    K: Into<String>,
    V: Into<DataValue>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_keys_are_unique() {
        let a = BlockKey::new();
        let b = BlockKey::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string().len(), 8);
    }

    #[test]
    fn test_entity_key_ordering() {
        assert!(EntityKey(2) > EntityKey(1));
    }

    #[test]
    fn test_data_value_accessors() {
        let map = data_map([("url", DataValue::from("http://a")), ("n", 3i64.into())]);
        assert_eq!(map["url"].as_str(), Some("http://a"));
        assert_eq!(map["n"].as_int(), Some(3));
        assert_eq!(map["n"].as_bool(), None);
    }

    #[test]
    fn test_data_value_untagged_json() {
        let value: DataValue = serde_json::from_str("true").unwrap();
        assert_eq!(value, DataValue::Bool(true));
        let value: DataValue = serde_json::from_str("\"x\"").unwrap();
        assert_eq!(value, DataValue::String("x".into()));
    }
}
