//! Flatrec Core: typed records and their primitive form
//!
//! This layer turns schema-described object trees into trees of primitives
//! and back:
//! - `SchemaType`: Named, ordered field declarations with defaults
//! - `Record`: An instance of a schema
//! - `TypedList` / `TypedMap`: Collections governed by one element type
//! - `Value`: The primitive tree ("flat" form) stores and codecs consume
//! - `ConvertManager`: Converters keyed by declared type
//!
//! Flattening is type-directed. Every field is converted according to its
//! declared type, and every value is checked against it in both directions.
//!
//! # Example
//!
//! ```rust
//! use flatrec_core::{DeclaredType, Object, SchemaType, TypedList, Value};
//!
//! let region = SchemaType::builder("Region")
//!     .field("name", DeclaredType::Str)
//!     .build();
//! let country = SchemaType::builder("Country")
//!     .field("name", DeclaredType::Str)
//!     .field("regions", TypedList::of_type(region.declared_type()))
//!     .build();
//!
//! let mut regions = TypedList::new(region.declared_type());
//! regions.push(region.instantiate([("name", "Tyrol")]).unwrap());
//! let austria = country
//!     .instantiate([("name", Object::from("Austria")), ("regions", Object::from(regions))])
//!     .unwrap();
//!
//! let flat = austria.flatten().unwrap();
//! assert_eq!(flat.get("name"), Some(&Value::from("Austria")));
//! assert_eq!(country.unflatten(&flat).unwrap(), austria);
//! ```

mod collection;
mod converter;
mod engine;
mod error;
mod object;
mod registry;
mod schema;
mod types;
mod value;

pub use collection::{TypedList, TypedMap};
pub use converter::{
    Capabilities, Converter, DateConverter, DateTimeConverter, RecordConverter, TimeConverter,
    TypedListConverter, TypedMapConverter,
};
pub use engine::{check_conformance, flatten, flatten_as, unflatten, Engine, EngineOptions};
pub use error::Error;
pub use object::{CustomObject, CustomValue, Object};
pub use registry::{register, unregister, ConvertManager, MatchMode};
pub use schema::{FieldDecl, Record, SchemaBuilder, SchemaId, SchemaRef, SchemaType};
pub use types::{CollectionKind, CollectionType, CustomId, CustomType, DeclaredType, TypeKey};
pub use value::Value;
