//! Response envelope validation.
//!
//! Remote apis answer with a JSON object carrying an optional status
//! `code`. A response is successful iff `code` is absent or zero.

use serde_json::Value;

use crate::{Error, Result};

/// Parse a raw body and check its envelope.
///
/// - Empty body: `Ok(Value::Null)`.
/// - Invalid JSON: api error with the parse error kind as code.
/// - Object with a non-zero `code`: api error carrying the whole envelope.
/// - Anything else is returned as parsed.
pub fn validate(body: &str, url: &str) -> Result<Value> {
    if body.is_empty() {
        return Ok(Value::Null);
    }

    let envelope: Value =
        serde_json::from_str(body).map_err(|e| Error::from_json(e).with_url(url))?;

    match envelope.get("code") {
        Some(code) if !is_success_code(code) => {
            Err(Error::from_remote(envelope).with_url(url))
        }
        _ => Ok(envelope),
    }
}

/// Check whether an envelope `code` means success.
///
/// Any representation of zero is success: `null`, `false`, numbers equal
/// to zero, and strings that parse as a number equal to zero once ASCII
/// whitespace is trimmed (`"0"`, `"00"`, `"0.0"`, `"-0"`, `"0e3"`).
/// Empty strings, other strings, `true`, arrays and objects are failures.
pub fn is_success_code(code: &Value) -> bool {
    match code {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f == 0.0),
        Value::String(s) => s
            .trim_matches(|c: char| c.is_ascii_whitespace())
            .parse::<f64>()
            .is_ok_and(|f| f == 0.0),
        Value::Array(_) | Value::Object(_) => false,
    }
}
