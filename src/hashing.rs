//! Hashing System - SHA-256 fingerprints
//!
//! Grammar and geometry hashes let two runs be compared for reproducibility
//! without diffing their output.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{to_string, Value};
use sha2::{Digest, Sha256};

use crate::grammar::Grammar;

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compact JSON with object keys in byte order at every depth.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    to_string(&into_canonical(serde_json::to_value(value)?))
}

fn into_canonical(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let ordered: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, into_canonical(v))).collect();
            Value::Object(ordered.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(into_canonical).collect()),
        other => other,
    }
}

/// Identity of a grammar: axiom, rules, angle, iterations and alphabet.
pub fn compute_grammar_hash(grammar: &Grammar) -> Result<String, serde_json::Error> {
    Ok(sha256_hex(canonical_json(grammar)?.as_bytes()))
}

pub fn compute_geometry_hash<T: Serialize>(geometry: &T) -> Result<String, serde_json::Error> {
    Ok(sha256_hex(canonical_json(geometry)?.as_bytes()))
}

/// run_hash = sha256(preset_id:preset_version:canonical_request:engine_version)
pub fn compute_run_hash(
    preset_id: &str,
    preset_version: &str,
    request: &impl Serialize,
    engine_version: &str,
) -> Result<String, serde_json::Error> {
    let canonical_request = canonical_json(request)?;
    let combined = format!(
        "{}:{}:{}:{}",
        preset_id, preset_version, canonical_request, engine_version
    );
    Ok(sha256_hex(combined.as_bytes()))
}
