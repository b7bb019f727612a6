//! Field deserializers that never fail a record.
//!
//! Remote documents carry nulls, numbers stored as strings and the odd
//! wrong type. Each helper reads the raw JSON value and falls back to the
//! field's default instead of rejecting the whole item.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Strings pass through, numbers and booleans are stringified, anything
/// else becomes "".
pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

/// Like [`string`], but `null` and non-scalars stay `None`.
pub fn optional_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Numbers, or strings holding a number ("799", " 1099.5 "); otherwise 0.
pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().unwrap_or_default(),
        Value::String(s) => s.trim().parse().unwrap_or_default(),
        _ => 0.0,
    })
}

/// Arrays keep their string entries; anything else is an empty list.
pub fn string_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(values) => values
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// Any value `T` can be read from, else `T::default()`.
pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Object of `T`s; entries that do not read as `T` become `T::default()`
/// and a non-object is an empty map.
pub fn map_values<'de, D, T>(deserializer: D) -> Result<BTreeMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(entries) => entries
            .into_iter()
            .map(|(key, value)| (key, T::deserialize(value).unwrap_or_default()))
            .collect(),
        _ => BTreeMap::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Row {
        #[serde(deserialize_with = "string")]
        name: String,
        #[serde(deserialize_with = "number")]
        price: f64,
        #[serde(deserialize_with = "string_list")]
        tags: Vec<String>,
        #[serde(deserialize_with = "optional_string")]
        note: Option<String>,
    }

    #[test]
    fn test_scalars_coerce() {
        let row: Row =
            serde_json::from_str(r#"{"name": 42, "price": "799", "tags": ["a", 1, null, "b"]}"#)
                .unwrap();
        assert_eq!(row.name, "42");
        assert_eq!(row.price, 799.0);
        assert_eq!(row.tags, vec!["a", "b"]);
        assert_eq!(row.note, None);
    }

    #[test]
    fn test_wrong_types_default() {
        let row: Row = serde_json::from_str(
            r#"{"name": null, "price": "n/a", "tags": "a,b", "note": {"x": 1}}"#,
        )
        .unwrap();
        assert_eq!(row.name, "");
        assert_eq!(row.price, 0.0);
        assert!(row.tags.is_empty());
        assert_eq!(row.note, None);
    }

    #[test]
    fn test_optional_string_keeps_empty() {
        let row: Row = serde_json::from_str(r#"{"note": ""}"#).unwrap();
        assert_eq!(row.note, Some(String::new()));
    }
}
