//! Response Envelope
//!
//! Every JSON object a handler returns gets `status` and `creator` merged in
//! ahead of its own fields. Keys the handler sets are kept as-is, including
//! the two reserved ones.

use serde_json::{Map, Value};

pub const STATUS_KEY: &str = "status";
pub const CREATOR_KEY: &str = "creator";

/// Merge envelope defaults into a handler payload
///
/// Non-object payloads are returned untouched.
pub fn apply_envelope(payload: Value, creator: &str) -> Value {
    match payload {
        Value::Object(fields) => {
            let mut merged = Map::with_capacity(fields.len() + 2);
            merged.insert(STATUS_KEY.to_string(), Value::Bool(true));
            merged.insert(CREATOR_KEY.to_string(), Value::String(creator.to_string()));
            // Re-inserting an existing key replaces its value in place
            for (key, value) in fields {
                merged.insert(key, value);
            }
            Value::Object(merged)
        }
        other => other,
    }
}
