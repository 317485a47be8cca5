//! Response body contracts of the classification endpoint.

use super::ClassifyError;
use serde::{Deserialize, Serialize};

/// How the endpoint encodes the result code in its body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// A bare token such as `2`, optionally wrapped in one pair of quotes.
    #[default]
    Plain,
    /// A JSON object with the code under a configured field.
    Json,
}

/// Extracts the raw result code from a response body.
///
/// The code is returned as sent; mapping it is the caller's job.
pub fn parse_body(
    body: &[u8],
    format: ResponseFormat,
    json_field: &str,
) -> Result<String, ClassifyError> {
    let text = std::str::from_utf8(body)
        .map_err(|_| ClassifyError::InvalidResponse("body is not valid UTF-8".into()))?;

    match format {
        ResponseFormat::Plain => parse_plain(text),
        ResponseFormat::Json => parse_json(text, json_field),
    }
}

fn parse_plain(text: &str) -> Result<String, ClassifyError> {
    let trimmed = text.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);

    if unquoted.is_empty() {
        return Err(ClassifyError::InvalidResponse("empty body".into()));
    }
    if unquoted.chars().any(|c| c.is_whitespace() || c == '"') {
        return Err(ClassifyError::InvalidResponse(format!(
            "expected a single code, got {:?}",
            truncate(unquoted)
        )));
    }
    Ok(unquoted.to_string())
}

fn parse_json(text: &str, field: &str) -> Result<String, ClassifyError> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| ClassifyError::InvalidResponse(format!("malformed JSON: {e}")))?;

    match value.get(field) {
        Some(serde_json::Value::String(code)) if !code.trim().is_empty() => Ok(code.clone()),
        Some(serde_json::Value::Number(code)) => Ok(code.to_string()),
        Some(other) => Err(ClassifyError::InvalidResponse(format!(
            "field {field:?} has unexpected value {other}"
        ))),
        None => Err(ClassifyError::InvalidResponse(format!(
            "missing field {field:?}"
        ))),
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(64).collect()
}
