//! Conversions between Value and serde types.

use serde::de::DeserializeOwned;
use serde::Serialize;

use flatrec_core::Value;
use serde_json::{Map, Number, Value as Json};

use crate::error::Error;

/// Convert a flattened tree into a Rust type via serde.
///
/// Flat records are plain maps, so any serde type with matching field
/// names can read them directly.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, Error> {
    Ok(serde_json::from_value(value_to_json(value))?)
}

/// Convert a Rust type into a flat tree via serde.
pub fn to_value<T: Serialize>(data: &T) -> Result<Value, Error> {
    Ok(json_to_value(serde_json::to_value(data)?))
}

/// Render a flat tree as JSON.
///
/// Non-finite floats have no JSON form and become null.
pub fn value_to_json(value: Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(b),
        Value::Integer(i) => Json::from(i),
        Value::Float(f) => Number::from_f64(f).map_or(Json::Null, Json::Number),
        Value::String(s) => Json::String(s),
        Value::Array(items) => items.into_iter().map(value_to_json).collect(),
        Value::Map(entries) => Json::Object(
            entries
                .into_iter()
                .map(|(key, item)| (key, value_to_json(item)))
                .collect::<Map<_, _>>(),
        ),
    }
}

/// Read a JSON document as a flat tree.
///
/// Integers that fit `i64` stay integral; every other number is a float.
pub fn json_to_value(json: Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => number_to_value(&n),
        Json::String(s) => Value::String(s),
        Json::Array(items) => Value::Array(items.into_iter().map(json_to_value).collect()),
        Json::Object(entries) => entries
            .into_iter()
            .map(|(key, item)| (key, json_to_value(item)))
            .collect(),
    }
}

fn number_to_value(n: &Number) -> Value {
    match (n.as_i64(), n.as_f64()) {
        (Some(i), _) => Value::Integer(i),
        (None, Some(f)) => Value::Float(f),
        // Only reachable with arbitrary precision numbers.
        (None, None) => Value::String(n.to_string()),
    }
}
