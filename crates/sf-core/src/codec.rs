//! Nested settings encoding
//!
//! Persisted settings and clipboard backups share one text format. A flat
//! object is split into three buckets:
//!
//! ```text
//! {"arrays":{"tag-blacklist":"{\"0\":\"a&b\",\"1\":\"c\"}"},
//!  "objects":{"duration":"{\"arrays\":{},\"objects\":{},\"properties\":{\"maximum\":600,\"minimum\":60}}"},
//!  "properties":{"disable-all-filters":false}}
//! ```
//!
//! Arrays become a JSON string of an index-keyed object, nested objects become
//! their own encoded string, and scalars are stored as-is.

use log::{debug, warn};
use serde_json::{Map, Value};

use crate::error::UserInputError;

/// Encode a flat settings object.
pub fn encode(object: &Map<String, Value>) -> String {
    let mut arrays = Map::new();
    let mut objects = Map::new();
    let mut properties = Map::new();

    for (key, value) in object {
        match value {
            Value::Array(items) => {
                arrays.insert(key.clone(), Value::String(encode_array(items)));
            }
            Value::Object(nested) => {
                objects.insert(key.clone(), Value::String(encode(nested)));
            }
            scalar => {
                properties.insert(key.clone(), scalar.clone());
            }
        }
    }

    let mut root = Map::new();
    root.insert("arrays".to_string(), Value::Object(arrays));
    root.insert("objects".to_string(), Value::Object(objects));
    root.insert("properties".to_string(), Value::Object(properties));
    Value::Object(root).to_string()
}

/// Index keys are written in numeric order so the text matches what a
/// browser produces for the same array.
fn encode_array(items: &[Value]) -> String {
    let mut out = String::with_capacity(2 + items.len() * 8);
    out.push('{');
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        out.push('"');
        out.push_str(&index.to_string());
        out.push_str("\":");
        out.push_str(&item.to_string());
    }
    out.push('}');
    out
}

/// Decode text produced by [`encode`].
pub fn decode(text: &str) -> Result<Map<String, Value>, UserInputError> {
    match decode_object(text) {
        Ok(settings) => {
            debug!("Decoded {} settings", settings.len());
            Ok(settings)
        }
        Err(e) => {
            warn!("Rejected settings text: {}", e);
            Err(e)
        }
    }
}

fn decode_object(text: &str) -> Result<Map<String, Value>, UserInputError> {
    let parsed: Value = serde_json::from_str(text)
        .map_err(|e| UserInputError::MalformedBackup(e.to_string()))?;
    let root = parsed
        .as_object()
        .ok_or_else(|| UserInputError::MalformedBackup("expected an object".to_string()))?;

    let mut result = Map::new();

    if let Some(arrays) = bucket(root, "arrays")? {
        for (key, encoded) in arrays {
            result.insert(key.clone(), Value::Array(decode_array(key, encoded)?));
        }
    }
    if let Some(objects) = bucket(root, "objects")? {
        for (key, encoded) in objects {
            let text = encoded.as_str().ok_or_else(|| {
                UserInputError::MalformedBackup(format!("object '{}' is not encoded text", key))
            })?;
            result.insert(key.clone(), Value::Object(decode_object(text)?));
        }
    }
    if let Some(properties) = bucket(root, "properties")? {
        for (key, value) in properties {
            result.insert(key.clone(), value.clone());
        }
    }

    Ok(result)
}

fn bucket<'a>(
    root: &'a Map<String, Value>,
    name: &str,
) -> Result<Option<&'a Map<String, Value>>, UserInputError> {
    match root.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(UserInputError::MalformedBackup(format!("'{}' is not an object", name))),
    }
}

fn decode_array(key: &str, encoded: &Value) -> Result<Vec<Value>, UserInputError> {
    let text = encoded.as_str().ok_or_else(|| {
        UserInputError::MalformedBackup(format!("array '{}' is not encoded text", key))
    })?;
    let indexed: Map<String, Value> = serde_json::from_str(text)
        .map_err(|e| UserInputError::MalformedBackup(format!("array '{}': {}", key, e)))?;

    let mut entries: Vec<(usize, Value)> = Vec::with_capacity(indexed.len());
    for (index, value) in indexed {
        let position = index.parse::<usize>().map_err(|_| {
            UserInputError::MalformedBackup(format!("array '{}' has non-numeric index '{}'", key, index))
        })?;
        entries.push((position, value));
    }
    entries.sort_by_key(|(position, _)| *position);

    Ok(entries.into_iter().map(|(_, value)| value).collect())
}
