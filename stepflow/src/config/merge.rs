//! Deterministic merging of JSON maps.

use serde_json::{Map, Value};

/// Recursively merges `update` into `original`.
///
/// Nested objects are merged key by key; for every other value the update
/// wins. Neither input is modified.
#[must_use]
pub fn recursive_update(original: &Map<String, Value>, update: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = original.clone();
    for (key, value) in update {
        let next = match (merged.get(key), value) {
            (Some(Value::Object(current)), Value::Object(incoming)) => {
                Value::Object(recursive_update(current, incoming))
            }
            _ => value.clone(),
        };
        merged.insert(key.clone(), next);
    }
    merged
}

/// Merges or replaces a map depending on `merge`.
#[must_use]
pub fn merge_or_replace(
    current: &Map<String, Value>,
    update: Option<&Map<String, Value>>,
    merge: bool,
) -> Map<String, Value> {
    match update {
        None => current.clone(),
        Some(update) if merge => recursive_update(current, update),
        Some(update) => update.clone(),
    }
}
