//! Strict decoding of model responses.
//!
//! Responses arrive as free text that should contain one JSON object.
//! Extraction scans brace depth while respecting string literals, so
//! nested payloads and prose wrappers both survive; decoding then goes
//! through serde for schema validation.

use crate::oracle::OracleError;
use serde::de::DeserializeOwned;

/// Extracts the first complete JSON object from a response.
///
/// Returns `None` when the text holds no balanced object.
pub fn extract_json_block(response: &str) -> Option<String> {
    let start = response.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in response[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(response[start..end].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

/// Decodes the first JSON object in a response into `T`.
///
/// A response with no JSON object, or one whose payload fails schema
/// decoding, is a typed error; callers decide whether that fails the
/// analysis or degrades to an empty result.
pub fn decode_payload<T: DeserializeOwned>(response: &str) -> Result<T, OracleError> {
    let block = extract_json_block(response).ok_or(OracleError::MissingPayload)?;
    let payload = serde_json::from_str(&block)?;
    Ok(payload)
}
