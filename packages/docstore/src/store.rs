//! Document identity, revisions and the store trait.

use std::fmt;

use serde::{Deserialize, Serialize};

use flatrec_core::{SchemaType, Value};

use crate::error::StoreError;

pub const ID_FIELD: &str = "_id";
pub const REV_FIELD: &str = "_rev";

/// Stable identifier of a stored document.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        DocumentId(id.into())
    }

    /// A fresh random id.
    pub fn generate() -> Self {
        DocumentId(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        DocumentId::new(id)
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        DocumentId(id)
    }
}

/// Revision token of a stored document, `<generation>-<nonce>`.
///
/// Every successful save produces a new revision with the generation
/// incremented, so revisions of one document never repeat.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    pub fn new(rev: impl Into<String>) -> Self {
        Revision(rev.into())
    }

    /// The revision of a newly created document.
    pub fn initial() -> Self {
        Self::with_generation(1)
    }

    /// The revision that follows this one.
    pub fn next(&self) -> Self {
        Self::with_generation(self.generation() + 1)
    }

    fn with_generation(generation: u64) -> Self {
        Revision(format!(
            "{}-{}",
            generation,
            uuid::Uuid::new_v4().simple()
        ))
    }

    /// Generation number; zero for tokens without one.
    pub fn generation(&self) -> u64 {
        self.0
            .split_once('-')
            .and_then(|(generation, _)| generation.parse().ok())
            .unwrap_or(0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A backend that persists flattened documents.
///
/// Documents are maps grouped into named collections; ids are unique per
/// collection. `_id` and `_rev` are managed by the store: a document saved
/// without `_id` gets a generated one, and a document that already exists
/// can only be replaced by a save carrying its current `_rev`.
pub trait DocumentStore {
    /// Persist `doc` in `collection`, returning its id and new revision.
    fn save(
        &mut self,
        collection: &str,
        doc: Value,
    ) -> Result<(DocumentId, Revision), StoreError>;

    /// The stored document, including `_id` and `_rev`.
    fn get(&mut self, collection: &str, id: &DocumentId) -> Result<Option<Value>, StoreError>;
}

/// The collection documents of `schema` live in: its lowercased name.
pub fn collection_name(schema: &SchemaType) -> String {
    schema.name().to_lowercase()
}

/// Resolve the id and next revision of `doc` and stamp both into it.
///
/// `stored` reports the revision currently stored under an id.
pub(crate) fn prepare_save<F>(
    doc: Value,
    stored: F,
) -> Result<(DocumentId, Revision, Value), StoreError>
where
    F: FnOnce(&DocumentId) -> Result<Option<Revision>, StoreError>,
{
    let Value::Map(mut fields) = doc else {
        return Err(StoreError::NotADocument {
            found: doc.type_name().to_string(),
        });
    };

    let id = match fields.get(ID_FIELD) {
        None | Some(Value::Null) => DocumentId::generate(),
        Some(Value::String(id)) => DocumentId::new(id.clone()),
        Some(other) => {
            return Err(StoreError::InvalidId {
                id: other.to_string(),
            })
        }
    };
    let given = match fields.get(REV_FIELD) {
        None | Some(Value::Null) => None,
        Some(Value::String(rev)) => Some(Revision::new(rev.clone())),
        Some(other) => {
            return Err(StoreError::InvalidRevision {
                rev: other.to_string(),
            })
        }
    };

    let actual = stored(&id)?;
    let rev = match (&actual, &given) {
        (None, None) => Revision::initial(),
        (Some(actual), Some(given)) if actual == given => actual.next(),
        _ => {
            return Err(StoreError::Conflict {
                id,
                expected: given,
                actual,
            })
        }
    };

    fields.insert(ID_FIELD.to_string(), Value::from(id.as_str()));
    fields.insert(REV_FIELD.to_string(), Value::from(rev.as_str()));
    Ok((id, rev, Value::Map(fields)))
}

/// The `_rev` recorded in a stored document.
pub(crate) fn stored_revision(doc: &Value) -> Option<Revision> {
    doc.get(REV_FIELD)
        .and_then(Value::as_str)
        .map(Revision::new)
}
