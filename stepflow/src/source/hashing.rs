//! Content hashing for source text and structured values.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Hashes source text into a lowercase hex SHA-256 digest.
///
/// The digest depends only on the text, so it is stable across processes.
#[must_use]
pub fn hash_source_code(source_code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_code.as_bytes());
    hex::encode(hasher.finalize())
}

/// Renders a JSON value with object keys sorted at every level.
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    match value {
        Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", rendered.join(","))
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let rendered: Vec<String> = entries
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), canonical_json(v)))
                .collect();
            format!("{{{}}}", rendered.join(","))
        }
        scalar => scalar.to_string(),
    }
}

/// Hashes the canonical rendering of a JSON value.
#[must_use]
pub fn hash_json(value: &Value) -> String {
    hash_source_code(&canonical_json(value))
}
