//! Error types for schema construction and conversion.

use crate::object::Object;
use crate::types::DeclaredType;
use crate::value::Value;

/// Errors raised while building records or converting them.
///
/// Every error is fatal to the flatten/unflatten call that produced it;
/// there is no partial result.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A value does not conform to its declared type.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// A record was constructed or assigned with an undeclared field name.
    #[error("schema {schema} declares no field '{field}'")]
    UnknownField { schema: String, field: String },

    /// A temporal converter could not parse its fixed textual format.
    #[error("cannot parse {input} as {format}")]
    Format { format: &'static str, input: String },

    /// A converter was registered that cannot honour the converter contract.
    #[error("converter contract violated: {message}")]
    ConverterContract { message: String },

    /// A value reached the primitive path although it has no primitive form.
    #[error("no converter registered for {type_name}")]
    NoConverter { type_name: String },

    /// Nesting went deeper than `EngineOptions::max_depth`.
    #[error("nesting exceeds the depth limit of {limit}")]
    DepthExceeded { limit: usize },
}

impl Error {
    /// Mismatch between a declared type and a runtime object.
    pub fn mismatch(expected: &DeclaredType, found: &Object) -> Self {
        Error::TypeMismatch {
            expected: expected.to_string(),
            found: found.type_name(),
        }
    }

    /// Mismatch between a declared type and a primitive input.
    pub fn mismatch_value(expected: &DeclaredType, found: &Value) -> Self {
        Error::TypeMismatch {
            expected: expected.to_string(),
            found: found.type_name().to_string(),
        }
    }

    pub fn format(format: &'static str, input: &Value) -> Self {
        Error::Format {
            format,
            input: input.to_string(),
        }
    }

    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Error::TypeMismatch { .. })
    }
}
