// ABOUTME: Sideband control-line extraction (metadata:, followup_questions:, tool:)
// ABOUTME: Unwinds the backend's double-JSON-encoding quirk and normalizes UUID map keys

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use ragline_core::keys::normalize_citation_key;
use ragline_core::{DocumentCitationMetadata, FollowupQuestions};

/// A recognized sideband line, split into marker and raw payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidebandLine<'a> {
    Metadata(&'a str),
    Followups(&'a str),
    Tool(&'a str),
}

/// Classify a non-`data:` stream line. The payload is everything after the
/// first colon.
pub fn classify(line: &str) -> Option<SidebandLine<'_>> {
    let trimmed = line.trim_start();
    if let Some(payload) = trimmed.strip_prefix("metadata:") {
        Some(SidebandLine::Metadata(payload))
    } else if let Some(payload) = trimmed.strip_prefix("followup_questions:") {
        Some(SidebandLine::Followups(payload))
    } else if let Some(payload) = trimmed.strip_prefix("tool:") {
        Some(SidebandLine::Tool(payload))
    } else {
        None
    }
}

/// Parse a JSON payload, unwinding one level of double encoding.
///
/// The backend sometimes ships JSON as a JSON-encoded string; a string result
/// from the first parse is parsed once more, never recursively beyond that.
/// Any failure returns None and the caller skips the line.
fn parse_json_payload(payload: &str) -> Option<Value> {
    let first: Value = match serde_json::from_str(payload.trim()) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "failed to parse sideband JSON payload, skipping line");
            return None;
        }
    };
    match first {
        Value::String(inner) => match serde_json::from_str(&inner) {
            Ok(value) => {
                debug!("unwrapped double-encoded sideband payload");
                Some(value)
            }
            Err(e) => {
                warn!(error = %e, "double-encoded sideband payload failed second parse, skipping line");
                None
            }
        },
        other => Some(other),
    }
}

/// Parse a `metadata:` payload into the citation metadata map.
///
/// Keys matching a UUID are canonicalized to braced form; other keys are kept
/// as received. Entries that fail shape validation are skipped individually.
pub fn parse_metadata(payload: &str) -> Option<HashMap<String, DocumentCitationMetadata>> {
    let value = parse_json_payload(payload)?;
    let Value::Object(entries) = value else {
        warn!("metadata payload is not an object, skipping line");
        return None;
    };

    let mut map = HashMap::with_capacity(entries.len());
    for (key, entry) in entries {
        let canonical = normalize_citation_key(&key).unwrap_or_else(|| key.trim().to_string());
        match serde_json::from_value::<DocumentCitationMetadata>(entry) {
            Ok(metadata) => {
                map.insert(canonical, metadata);
            }
            Err(e) => {
                warn!(key = %key, error = %e, "malformed citation metadata entry, skipping");
            }
        }
    }
    Some(map)
}

/// Parse a `followup_questions:` payload. The shape must be an object with a
/// string `topic` and an array-of-strings `followups`.
pub fn parse_followups(payload: &str) -> Option<FollowupQuestions> {
    let value = parse_json_payload(payload)?;
    match serde_json::from_value::<FollowupQuestions>(value) {
        Ok(followups) => Some(followups),
        Err(e) => {
            warn!(error = %e, "malformed followup_questions payload, skipping line");
            None
        }
    }
}

/// Parse a `tool:` payload into the tooling channel's replacement value.
pub fn parse_tool(payload: &str) -> Option<String> {
    let value = parse_json_payload(payload)?;
    if !value.is_object() {
        warn!("tool payload is not an object, skipping line");
        return None;
    }
    Some(tool_value(&value))
}

/// The tooling value carried by a tool object: its `action` field when
/// present, otherwise the whole object stringified.
pub(crate) fn tool_value(value: &Value) -> String {
    if let Some(action) = value.get("action") {
        return match action {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
    }
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Interpret the raw value of an inline `(tool: ...)` call. A quoted form
/// yields the string itself; an object form goes through `tool_value`.
pub(crate) fn tool_call_value(raw: &str) -> String {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => tool_value(&value),
        Err(_) => raw.to_string(),
    }
}
