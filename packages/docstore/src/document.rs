//! Records that live in a document store.

use lazy_static::lazy_static;

use flatrec_core::{DeclaredType, Object, Record, SchemaRef, SchemaType, Value};

use crate::error::StoreError;
use crate::store::{collection_name, DocumentId, DocumentStore, Revision, ID_FIELD, REV_FIELD};

lazy_static! {
    static ref DOCUMENT_SCHEMA: SchemaRef = SchemaType::builder("Document")
        .field(ID_FIELD, DeclaredType::Str)
        .field(REV_FIELD, DeclaredType::Str)
        .build();
}

/// Base schema of every storable record: `_id` and `_rev`, both strings.
///
/// Application schemas extend it:
///
/// ```rust
/// use flatrec_core::{DeclaredType, SchemaType};
/// use flatrec_docstore::document_schema;
///
/// let person = SchemaType::builder("Person")
///     .extends(document_schema())
///     .field("name", DeclaredType::Str)
///     .build();
/// assert!(person.has_field("_id"));
/// ```
pub fn document_schema() -> &'static SchemaRef {
    &DOCUMENT_SCHEMA
}

/// A record whose schema extends [`document_schema`].
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    record: Record,
}

impl Document {
    pub fn new(record: Record) -> Result<Self, StoreError> {
        if !record.is_instance_of(document_schema()) {
            return Err(StoreError::NotADocument {
                found: record.schema().name().to_string(),
            });
        }
        Ok(Document { record })
    }

    /// Fetch the document stored under `id` in the collection of `schema`
    /// and rebuild it as `schema`.
    pub fn load(
        store: &mut dyn DocumentStore,
        schema: &SchemaRef,
        id: &DocumentId,
    ) -> Result<Self, StoreError> {
        if !schema.is_a(document_schema().id()) {
            return Err(StoreError::NotADocument {
                found: schema.name().to_string(),
            });
        }
        let flat = store
            .get(&collection_name(schema), id)?
            .ok_or_else(|| StoreError::NotFound { id: id.clone() })?;
        log::debug!("Loaded document {} as {}", id, schema.name());
        Document::new(schema.unflatten(&flat)?)
    }

    /// Flatten and persist this document in the collection of its schema.
    ///
    /// Unset `_id` and `_rev` are left out so the store assigns them. On
    /// success both are written back, so the next `store` updates the
    /// same document.
    pub fn store(
        &mut self,
        store: &mut dyn DocumentStore,
    ) -> Result<(DocumentId, Revision), StoreError> {
        let mut flat = self.record.flatten()?;
        if let Some(fields) = flat.as_map_mut() {
            for identity in [ID_FIELD, REV_FIELD] {
                if fields.get(identity).is_some_and(Value::is_null) {
                    fields.remove(identity);
                }
            }
        }

        let (id, rev) = store.save(&self.collection(), flat)?;
        self.record.set(ID_FIELD, id.as_str())?;
        self.record.set(REV_FIELD, rev.as_str())?;
        Ok((id, rev))
    }

    /// The collection this document is stored in.
    pub fn collection(&self) -> String {
        collection_name(self.record.schema())
    }

    pub fn id(&self) -> Option<DocumentId> {
        self.record
            .get(ID_FIELD)
            .and_then(Object::as_str)
            .map(DocumentId::from)
    }

    pub fn revision(&self) -> Option<Revision> {
        self.record
            .get(REV_FIELD)
            .and_then(Object::as_str)
            .map(Revision::new)
    }

    pub fn get(&self, name: &str) -> Option<&Object> {
        self.record.get(name)
    }

    pub fn set(&mut self, name: &str, value: impl Into<Object>) -> Result<(), StoreError> {
        Ok(self.record.set(name, value)?)
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    pub fn into_record(self) -> Record {
        self.record
    }
}

/// Fetch the document stored under `id` in the collection of `schema` and
/// rebuild it as `schema`.
pub fn load(
    store: &mut dyn DocumentStore,
    schema: &SchemaRef,
    id: &DocumentId,
) -> Result<Document, StoreError> {
    Document::load(store, schema, id)
}
