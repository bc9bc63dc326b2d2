//! Query-string helpers shared by route handlers

use crate::core::error::{ServiceError, ServiceResult};
use serde_json::{Map, Value};

/// Split a comma-separated query parameter into its values
///
/// Returns `None` for an absent or empty input. Each element is trimmed and
/// rejected with `BadRequest` when it is empty, outside `allowed` (when
/// given) or repeated.
pub fn parse_comma_separated_string(
    input: Option<&str>,
    allowed: Option<&[&str]>,
) -> ServiceResult<Option<Vec<String>>> {
    let Some(input) = input.filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    let mut values: Vec<String> = Vec::new();
    for raw in input.split(',') {
        let value = raw.trim();
        if value.is_empty() {
            return Err(ServiceError::BadRequest("Empty value.".to_string()));
        }
        if let Some(allowed) = allowed {
            if !allowed.contains(&value) {
                return Err(ServiceError::BadRequest(format!("Invalid value: {}", value)));
            }
        }
        if values.iter().any(|v| v == value) {
            return Err(ServiceError::BadRequest(format!("Duplicate values: {}", value)));
        }
        values.push(value.to_string());
    }

    Ok(Some(values))
}

/// Keep only the requested top-level fields of a JSON object
///
/// Non-object values are returned unchanged; unknown field names are ignored.
pub fn select_fields(value: Value, fields: &[String]) -> Value {
    match value {
        Value::Object(mut object) => {
            let selected: Map<String, Value> = fields
                .iter()
                .filter_map(|f| object.remove(f).map(|v| (f.clone(), v)))
                .collect();
            Value::Object(selected)
        }
        other => other,
    }
}
