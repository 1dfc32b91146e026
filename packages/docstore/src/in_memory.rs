//! In-memory document store.

use std::collections::BTreeMap;

use flatrec_core::Value;

use crate::error::StoreError;
use crate::store::{prepare_save, stored_revision, DocumentId, DocumentStore, Revision};

/// A document store backed by a map, for tests and ephemeral data.
///
/// # Example
///
/// ```rust
/// use flatrec_core::Value;
/// use flatrec_docstore::{DocumentStore, InMemoryStore};
///
/// let mut store = InMemoryStore::new();
/// let doc: Value = [("name", "Alice")].into_iter().collect();
///
/// let (id, rev) = store.save("person", doc).unwrap();
/// let stored = store.get("person", &id).unwrap().unwrap();
/// assert_eq!(stored.get("_rev"), Some(&Value::from(rev.as_str())));
/// assert_eq!(store.get("robot", &id).unwrap(), None);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: BTreeMap<String, BTreeMap<DocumentId, Value>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents across all collections.
    pub fn len(&self) -> usize {
        self.collections.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self, collection: &str) -> impl Iterator<Item = &DocumentId> {
        self.collections.get(collection).into_iter().flat_map(BTreeMap::keys)
    }
}

impl DocumentStore for InMemoryStore {
    fn save(
        &mut self,
        collection: &str,
        doc: Value,
    ) -> Result<(DocumentId, Revision), StoreError> {
        let docs = self.collections.entry(collection.to_string()).or_default();
        let (id, rev, doc) = prepare_save(doc, |id| Ok(docs.get(id).and_then(stored_revision)))?;
        docs.insert(id.clone(), doc);
        Ok((id, rev))
    }

    fn get(&mut self, collection: &str, id: &DocumentId) -> Result<Option<Value>, StoreError> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }
}
