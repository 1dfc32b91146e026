use std::io;
use std::path::PathBuf;

use crate::store::{DocumentId, Revision};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Flatten(#[from] flatrec_core::Error),

    #[error(transparent)]
    Json(#[from] flatrec_json::Error),

    /// The update did not carry the revision currently stored.
    #[error("conflict on document {id}: stored {actual:?}, update carried {expected:?}")]
    Conflict {
        id: DocumentId,
        expected: Option<Revision>,
        actual: Option<Revision>,
    },

    #[error("no document with id {id}")]
    NotFound { id: DocumentId },

    #[error("expected a document, found {found}")]
    NotADocument { found: String },

    #[error("invalid document id {id}")]
    InvalidId { id: String },

    #[error("invalid collection name {name}")]
    InvalidCollection { name: String },

    #[error("invalid revision {rev}")]
    InvalidRevision { rev: String },

    #[error("An error occurred trying to read the root path {path}: {error}")]
    RootPathInvalid { path: PathBuf, error: io::Error },

    #[error("{0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}
