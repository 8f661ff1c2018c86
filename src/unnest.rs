//! Include unwrapping.
//!
//! SportMonks wraps every include in a `{"data": ...}` object:
//!
//! ```text
//! {"id": 1, "season": {"data": {"id": 16216, "name": "2019/2020"}}}
//! ```
//!
//! which is flattened here to `{"id": 1, "season": {"id": 16216, "name": "2019/2020"}}`.

use serde_json::{Map, Value};

use crate::error::IngestError;
use crate::models::json_kind;

/// Replace every `{"data": x}` member of `object` with `x`, recursing into the
/// unwrapped contents.
pub fn unnest_includes(object: Map<String, Value>) -> Map<String, Value> {
    object
        .into_iter()
        .map(|(key, value)| (key, unwrap_include(value)))
        .collect()
}

fn unwrap_include(value: Value) -> Value {
    let inner = match value {
        Value::Object(mut map) if map.len() == 1 && map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => return other,
    };

    match inner {
        Value::Object(map) => Value::Object(unnest_includes(map)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => Value::Object(unnest_includes(map)),
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}

/// Unwrap the includes of a response `data` member.
///
/// Fails fast when the value is neither an object nor a list of objects.
pub fn unnest_response(data: Value) -> Result<Value, IngestError> {
    match data {
        Value::Object(map) => Ok(Value::Object(unnest_includes(map))),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Ok(Value::Object(unnest_includes(map))),
                other => Err(IngestError::InvalidShape(format!(
                    "can't unnest list element of type {}",
                    json_kind(&other)
                ))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Err(IngestError::InvalidShape(format!(
            "can't unnest an object of type {}",
            json_kind(&other)
        ))),
    }
}
