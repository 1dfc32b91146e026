//! JSON codec implementation.

use bytes::Bytes;
use flatrec_core::{DeclaredType, Object, Record, SchemaRef, Value};

use crate::convert::{json_to_value, value_to_json};
use crate::error::Error;

/// Encodes flattened trees as JSON bytes and decodes them back.
///
/// # Example
///
/// ```rust
/// use flatrec_json::JsonCodec;
/// use flatrec_core::Value;
///
/// let codec = JsonCodec::new();
/// let value = Value::from("hello");
///
/// let bytes = codec.encode(&value).unwrap();
/// let decoded = codec.decode(&bytes).unwrap();
///
/// assert_eq!(decoded, value);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec {
    pretty: bool,
}

impl JsonCodec {
    /// Compact output.
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Indented output, for files people read.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Value, Error> {
        let json: serde_json::Value = serde_json::from_slice(bytes)?;
        Ok(json_to_value(json))
    }

    pub fn encode(&self, value: &Value) -> Result<Bytes, Error> {
        let json = value_to_json(value.clone());
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(&json)?
        } else {
            serde_json::to_vec(&json)?
        };
        Ok(Bytes::from(bytes))
    }

    /// Flatten `record` and encode the result.
    pub fn encode_record(&self, record: &Record) -> Result<Bytes, Error> {
        self.encode(&record.flatten()?)
    }

    /// Decode JSON and rebuild an instance of `schema` from it.
    pub fn decode_record(&self, schema: &SchemaRef, bytes: &[u8]) -> Result<Record, Error> {
        Ok(schema.unflatten(&self.decode(bytes)?)?)
    }

    /// Decode JSON and rebuild a value of `declared` from it.
    pub fn decode_as(&self, declared: &DeclaredType, bytes: &[u8]) -> Result<Object, Error> {
        Ok(flatrec_core::unflatten(declared, &self.decode(bytes)?)?)
    }
}

/// Encode a record as a compact JSON string.
pub fn to_json_string(record: &Record) -> Result<String, Error> {
    Ok(serde_json::to_string(&value_to_json(record.flatten()?))?)
}

/// Rebuild an instance of `schema` from a JSON string.
pub fn from_json_str(schema: &SchemaRef, json: &str) -> Result<Record, Error> {
    JsonCodec::new().decode_record(schema, json.as_bytes())
}
