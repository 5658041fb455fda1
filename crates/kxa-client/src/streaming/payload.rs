//! Payload decoding
//!
//! Parses one frame's payload into a [`DecodedEvent`], or recognizes the
//! termination sentinel.

use serde_json::Value;
use thiserror::Error;

use super::types::DecodedEvent;

/// Payload that ends the stream successfully
pub const DONE_SENTINEL: &str = "[DONE]";

/// Longest payload excerpt kept in a parse error
const PREVIEW_LEN: usize = 100;

/// Result of decoding one payload
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A regular event
    Event(DecodedEvent),
    /// Termination sentinel
    Done,
}

/// A payload that could not be decoded
///
/// Never fatal to the stream; the frame is skipped.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Not valid JSON
    #[error("Invalid JSON: {source} (data: {preview})")]
    Json {
        #[source]
        source: serde_json::Error,
        preview: String,
    },

    /// Valid JSON of a kind that is not an event
    #[error("Unsupported payload shape: {kind} (data: {preview})")]
    Shape { kind: &'static str, preview: String },
}

/// Decode a raw payload
///
/// Accepts a bare JSON string (treated as a text delta) or an object.
/// Missing object fields are absent; unknown ones are ignored.
pub fn decode_payload(raw: &str) -> Result<Payload, PayloadError> {
    let trimmed = raw.trim();

    if trimmed == DONE_SENTINEL {
        return Ok(Payload::Done);
    }

    let value: Value = serde_json::from_str(trimmed).map_err(|source| PayloadError::Json {
        source,
        preview: preview(trimmed),
    })?;

    match value {
        Value::String(text) => Ok(Payload::Event(DecodedEvent::delta(text))),
        Value::Object(_) => serde_json::from_value(value)
            .map(Payload::Event)
            .map_err(|source| PayloadError::Json {
                source,
                preview: preview(trimmed),
            }),
        other => Err(PayloadError::Shape {
            kind: kind_of(&other),
            preview: preview(trimmed),
        }),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Truncate on a char boundary for error context
fn preview(data: &str) -> String {
    match data.char_indices().nth(PREVIEW_LEN) {
        Some((idx, _)) => format!("{}...", &data[..idx]),
        None => data.to_string(),
    }
}
