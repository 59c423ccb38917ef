//! Open-ended attribute bags.
//!
//! # Responsibility
//! - Model metadata/properties/features maps as a recursive document value.
//! - Convert losslessly to and from `serde_json::Value` for JSONB storage.
//!
//! # Invariants
//! - Maps are `BTreeMap`s, so serialization order is deterministic.
//! - Conversion round-trips: `from_json(to_json(m)) == m`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// String-keyed recursive attribute map.
pub type MetaMap = BTreeMap<String, MetaValue>;

/// One value inside an attribute bag.
///
/// Serialized untagged, so the on-disk shape is plain JSON. `Int` is tried
/// before `Float` during deserialization to keep integers exact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<MetaValue>),
    Map(MetaMap),
}

impl MetaValue {
    /// Returns the string payload when the value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Returns the nested map when the value is a map.
    pub fn as_map(&self) -> Option<&MetaMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// Converts an attribute map to a JSON value for JSONB storage.
pub fn to_json(map: &MetaMap) -> serde_json::Value {
    serde_json::to_value(map).unwrap_or(serde_json::Value::Null)
}

/// Reconstructs an attribute map from a stored JSON value.
///
/// `Null` and absent columns both map to the empty bag; any other non-object
/// value is reported as a message for the caller's invalid-data path.
pub fn from_json(value: serde_json::Value) -> Result<MetaMap, String> {
    match value {
        serde_json::Value::Null => Ok(MetaMap::new()),
        serde_json::Value::Object(_) => serde_json::from_value(value)
            .map_err(|err| format!("attribute bag does not deserialize: {err}")),
        other => Err(format!("attribute bag is not an object: {other}")),
    }
}

/// Looks up a string-valued key.
pub fn get_str<'m>(map: &'m MetaMap, key: &str) -> Option<&'m str> {
    map.get(key).and_then(MetaValue::as_str)
}

#[cfg(test)]
mod tests {
    use super::{from_json, get_str, to_json, MetaMap, MetaValue};

    fn sample() -> MetaMap {
        let mut inner = MetaMap::new();
        inner.insert("sg:gen".into(), MetaValue::from("algorytmu"));
        let mut map = MetaMap::new();
        map.insert("countable".into(), MetaValue::from("no"));
        map.insert("weight".into(), MetaValue::Float(0.5));
        map.insert("rank".into(), MetaValue::Int(3));
        map.insert("declension_override".into(), MetaValue::Map(inner));
        map.insert(
            "tags".into(),
            MetaValue::List(vec![MetaValue::from("a"), MetaValue::from("b")]),
        );
        map
    }

    #[test]
    fn json_round_trip_preserves_values() {
        let map = sample();
        let restored = from_json(to_json(&map)).unwrap();
        assert_eq!(restored, map);
    }

    #[test]
    fn integers_stay_integers() {
        let restored = from_json(serde_json::json!({"n": 7})).unwrap();
        assert_eq!(restored.get("n"), Some(&MetaValue::Int(7)));
    }

    #[test]
    fn null_column_is_empty_bag() {
        assert_eq!(from_json(serde_json::Value::Null).unwrap(), MetaMap::new());
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(from_json(serde_json::json!([1, 2])).is_err());
    }

    #[test]
    fn serialization_order_is_deterministic() {
        let map = sample();
        assert_eq!(
            serde_json::to_string(&map).unwrap(),
            serde_json::to_string(&from_json(to_json(&map)).unwrap()).unwrap()
        );
    }

    #[test]
    fn get_str_ignores_non_strings() {
        let map = sample();
        assert_eq!(get_str(&map, "countable"), Some("no"));
        assert_eq!(get_str(&map, "rank"), None);
        assert_eq!(get_str(&map, "missing"), None);
    }
}
