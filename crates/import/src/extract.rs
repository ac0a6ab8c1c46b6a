use serde_json::Value;

use crate::error::ImportError;

/// Pull bill records out of a raw payload.
///
/// Accepted shapes, tried in order:
/// - the bill API envelope `{"success": true, "data": [...]}`
/// - a bare JSON array of records
/// - a single record object
/// - JSON embedded in surrounding text: the first balanced `[...]` or `{...}`
///   that parses is used, then unwrapped as above
///
/// Records are returned unvalidated; `reconcile` decides what to keep.
pub fn extract_records(text: &str) -> Result<Vec<Value>, ImportError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return unwrap_payload(value);
    }

    match find_embedded_json(trimmed) {
        Some(value) => unwrap_payload(value),
        None => Err(ImportError::Payload(
            "no JSON array or object found".to_string(),
        )),
    }
}

fn unwrap_payload(value: Value) -> Result<Vec<Value>, ImportError> {
    match value {
        Value::Array(records) => Ok(records),
        Value::Object(mut map) if map.contains_key("success") || map.contains_key("data") => {
            if let Some(false) = map.get("success").and_then(Value::as_bool) {
                let message = map
                    .get("message")
                    .or_else(|| map.get("error"))
                    .and_then(Value::as_str)
                    .unwrap_or("source reported failure");
                return Err(ImportError::Payload(message.to_string()));
            }
            match map.remove("data") {
                Some(Value::Array(records)) => Ok(records),
                Some(Value::Null) | None => Ok(Vec::new()),
                Some(record @ Value::Object(_)) => Ok(vec![record]),
                Some(other) => Err(ImportError::Payload(format!(
                    "envelope data is not a list: {other}"
                ))),
            }
        }
        record @ Value::Object(_) => Ok(vec![record]),
        other => Err(ImportError::Payload(format!(
            "expected a JSON array or object, got {other}"
        ))),
    }
}

/// First balanced JSON array or object in `text` that parses.
fn find_embedded_json(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let mut start = 0;
    while let Some(offset) = bytes[start..].iter().position(|b| *b == b'[' || *b == b'{') {
        let open = start + offset;
        if let Some(close) = matching_close(bytes, open) {
            if let Ok(value) = serde_json::from_str::<Value>(&text[open..=close]) {
                return Some(value);
            }
        }
        start = open + 1;
    }
    None
}

/// Index of the bracket closing the one at `open`, skipping string contents.
fn matching_close(bytes: &[u8], open: usize) -> Option<usize> {
    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' => stack.push(b']'),
            b'{' => stack.push(b'}'),
            b']' | b'}' => {
                if stack.pop() != Some(b) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
