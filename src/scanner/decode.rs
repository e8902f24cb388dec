use serde_json::Value;

use super::types::ScanResponse;
use crate::error::DecodeError;

/// Decode one complete scanner output document.
///
/// The whole payload is a single JSON document, matched case-insensitively
/// on field names. Absent or null optional fields become the empty
/// representation; only structural failures are errors, and those always
/// carry the original text.
pub fn decode(raw: &[u8]) -> Result<ScanResponse, DecodeError> {
    let text = match std::str::from_utf8(raw) {
        Ok(text) => text,
        Err(err) => {
            return Err(DecodeError::MalformedPayload {
                raw_text: String::from_utf8_lossy(raw).into_owned(),
                cause: format!("invalid UTF-8: {}", err),
            })
        }
    };

    let value: Value = serde_json::from_str(text).map_err(|err| DecodeError::MalformedPayload {
        raw_text: text.to_string(),
        cause: err.to_string(),
    })?;

    serde_json::from_value(lowercase_keys(value)).map_err(|err| DecodeError::MalformedPayload {
        raw_text: text.to_string(),
        cause: err.to_string(),
    })
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key.to_ascii_lowercase(), lowercase_keys(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}
