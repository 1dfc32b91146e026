//! Document stores for flattened records
//!
//! Records whose schema extends [`document_schema`] carry an `_id` and a
//! `_rev`. This layer persists them through a [`DocumentStore`]:
//! - `InMemoryStore`: a revisioned map
//! - `LocalDiskStore`: one JSON file per document
//!
//! Each schema's documents live in their own collection, named after the
//! schema, so ids only need to be unique per schema.
//!
//! Saving checks revisions, so an update built from an outdated copy of a
//! document fails with [`StoreError::Conflict`] instead of overwriting
//! newer data.
//!
//! # Example
//!
//! ```rust
//! use flatrec_core::{DeclaredType, Object, SchemaType};
//! use flatrec_docstore::{document_schema, load, Document, InMemoryStore};
//!
//! let person = SchemaType::builder("Person")
//!     .extends(document_schema())
//!     .field("name", DeclaredType::Str)
//!     .build();
//!
//! let mut store = InMemoryStore::new();
//! let mut john = Document::new(person.instantiate([("name", "John Doe")]).unwrap()).unwrap();
//! let (id, _) = john.store(&mut store).unwrap();
//!
//! let loaded = load(&mut store, &person, &id).unwrap();
//! assert_eq!(loaded.get("name"), Some(&Object::from("John Doe")));
//! ```

mod document;
mod error;
mod in_memory;
mod local_disk;
mod store;

pub use document::{document_schema, load, Document};
pub use error::StoreError;
pub use in_memory::InMemoryStore;
pub use local_disk::LocalDiskStore;
pub use store::{collection_name, DocumentId, DocumentStore, Revision, ID_FIELD, REV_FIELD};
