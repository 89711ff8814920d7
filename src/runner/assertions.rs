//! Body assertions applied by scenarios after the status code matched.
//!
//! Each check returns `Err(reason)` on failure; the reason ends up in the
//! recorded outcome's `error` field.

use crate::probe::ResponseBody;
use serde_json::Value;

/// Every key must be present on a JSON object body
pub fn require_keys(body: &ResponseBody, keys: &[&str]) -> Result<(), String> {
    let missing: Vec<&str> = keys
        .iter()
        .copied()
        .filter(|key| !body.contains_key(key))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!("missing required fields: {}", missing.join(", ")))
    }
}

/// The body's `success` flag must be `true`
pub fn require_success_flag(body: &ResponseBody) -> Result<(), String> {
    match body.get("success").and_then(Value::as_bool) {
        Some(true) => Ok(()),
        _ => {
            let error = body
                .get("error")
                .map(display_value)
                .unwrap_or_else(|| "Unknown error".to_string());
            Err(format!("response reported success=false: {}", error))
        }
    }
}

/// Fails only for an object body carrying an `error` key
pub fn reject_error_object(body: &ResponseBody) -> Result<(), String> {
    match body.get("error") {
        Some(error) => Err(format!("response contained error: {}", display_value(error))),
        None => Ok(()),
    }
}

/// Strings without quotes, everything else as JSON
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// String entries of a JSON array found at `pointer`
pub fn string_list(body: &ResponseBody, pointer: &str) -> Vec<String> {
    body.pointer(pointer)
        .and_then(Value::as_array)
        .map(|items| items.iter().map(display_value).collect())
        .unwrap_or_default()
}
