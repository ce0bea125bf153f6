//! Failure classification.
//!
//! Reduces every [`DriverError`] to a plain, non-empty message. Engine errors
//! prefer the nested `failureInfo.message`, then the top-level `message`, then
//! a generic fallback.

use serde_json::Value;

use crate::driver::{DatabaseError, DriverError};

/// Message used when an engine error carries no usable text.
pub const UNSPECIFIED_ERROR: &str = "Unspecified error";

/// Returns the human-readable message for a driver failure.
pub fn classify(error: &DriverError) -> String {
    match error {
        DriverError::Database(db_error) => database_message(db_error),
        // Alternate formatting keeps the whole context chain.
        DriverError::Other(e) => non_empty(format!("{e:#}")),
        other => non_empty(other.to_string()),
    }
}

/// Returns the most specific message carried by an engine error.
pub fn database_message(error: &DatabaseError) -> String {
    match error {
        DatabaseError::Structured(payload) => structured_message(payload),
        DatabaseError::Message(message) => non_empty(message.clone()),
    }
}

fn structured_message(payload: &Value) -> String {
    if let Value::String(message) = payload {
        return non_empty(message.clone());
    }

    let nested = payload
        .pointer("/failureInfo/message")
        .and_then(Value::as_str);
    let top_level = payload.get("message").and_then(Value::as_str);

    [nested, top_level]
        .into_iter()
        .flatten()
        .find(|message| !message.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| fallback_message(payload))
}

/// Generic message annotated with whatever identifiers the payload has.
fn fallback_message(payload: &Value) -> String {
    let annotations = ["errorName", "errorType", "errorCode"]
        .into_iter()
        .filter_map(|key| {
            let value = match payload.get(key)? {
                Value::String(s) if !s.is_empty() => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            Some(format!("{key}: {value}"))
        })
        .collect::<Vec<_>>();

    if annotations.is_empty() {
        UNSPECIFIED_ERROR.to_string()
    } else {
        format!("{} ({})", UNSPECIFIED_ERROR, annotations.join(", "))
    }
}

fn non_empty(message: String) -> String {
    if message.trim().is_empty() {
        UNSPECIFIED_ERROR.to_string()
    } else {
        message
    }
}
