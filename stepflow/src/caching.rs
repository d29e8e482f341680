//! Cache-key derivation.
//!
//! The caching fingerprint maps a fixed key to the hash of the step's own
//! source and one key per output to the hash of its materializer's source.
//! It changes exactly when the step logic or a materializer changes; this
//! crate never interprets cache hits itself.

use crate::errors::SourceError;
use crate::source::{canonical_json, hash_source_code, Source, SourceResolver};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Key of the step source entry in the caching fingerprint.
pub const STEP_SOURCE_PARAMETER_NAME: &str = "step_source";

/// Key of an output's materializer entry in the caching fingerprint.
#[must_use]
pub fn materializer_cache_key(output: &str) -> String {
    format!("{output}_materializer_source")
}

/// Computes the caching fingerprint of a step.
///
/// # Errors
///
/// Returns an error if a materializer source cannot be hashed by the resolver.
pub fn compute_caching_parameters<'a>(
    step_code: &str,
    materializers: impl IntoIterator<Item = (&'a str, &'a Source)>,
    resolver: &dyn SourceResolver,
) -> Result<BTreeMap<String, String>, SourceError> {
    let mut parameters = BTreeMap::new();
    parameters.insert(
        STEP_SOURCE_PARAMETER_NAME.to_string(),
        hash_source_code(step_code),
    );

    for (output, source) in materializers {
        let hash = resolver.hash_source(source)?;
        tracing::trace!(output, materializer = %source, hash = %hash, "Hashed materializer source");
        parameters.insert(materializer_cache_key(output), hash);
    }

    Ok(parameters)
}

/// Combines a caching fingerprint and resolved parameters into one digest.
#[must_use]
pub fn cache_key(caching_parameters: &BTreeMap<String, String>, parameters: &Map<String, Value>) -> String {
    let fingerprint: Map<String, Value> = caching_parameters
        .iter()
        .map(|(key, hash)| (key.clone(), Value::String(hash.clone())))
        .collect();

    let mut combined = Map::new();
    combined.insert("caching_parameters".to_string(), Value::Object(fingerprint));
    combined.insert("parameters".to_string(), Value::Object(parameters.clone()));

    hash_source_code(&canonical_json(&Value::Object(combined)))
}
