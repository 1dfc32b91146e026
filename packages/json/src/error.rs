//! Error type for the JSON layer.

/// Errors raised while moving between JSON and flattened records.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Input was not valid JSON, or a serde type could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The decoded tree did not fit the requested schema.
    #[error(transparent)]
    Flatten(#[from] flatrec_core::Error),
}

impl Error {
    /// True when the failure is a declared-type mismatch.
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Error::Flatten(e) if e.is_type_mismatch())
    }
}
