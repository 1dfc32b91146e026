//! Record schemas and record instances.
//!
//! A [`SchemaType`] is an ordered list of field declarations built once by a
//! [`SchemaBuilder`]. A [`Record`] is one instance of a schema: a value slot
//! per declared field, initialised from the field defaults.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::Error;
use crate::object::Object;
use crate::types::{DeclaredType, TypeKey};
use crate::value::Value;

static NEXT_SCHEMA_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a schema type. Two schemas with the same name are still
/// different types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(u64);

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared handle to a schema type.
pub type SchemaRef = Arc<SchemaType>;

/// One declared field: name, declared type and default value.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDecl {
    name: String,
    declared: DeclaredType,
    default: Object,
}

impl FieldDecl {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> &DeclaredType {
        &self.declared
    }

    pub fn default_value(&self) -> &Object {
        &self.default
    }
}

/// A record schema: a named, ordered set of field declarations.
pub struct SchemaType {
    id: SchemaId,
    name: String,
    parent: Option<SchemaRef>,
    fields: Vec<FieldDecl>,
    index: HashMap<String, usize>,
}

impl SchemaType {
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            parent: None,
            fields: Vec::new(),
        }
    }

    pub fn id(&self) -> SchemaId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&SchemaRef> {
        self.parent.as_ref()
    }

    pub fn key(&self) -> TypeKey {
        TypeKey::Record(self.id)
    }

    /// Field declarations in declaration order, inherited fields first.
    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(FieldDecl::name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    pub fn field_type(&self, name: &str) -> Option<&DeclaredType> {
        self.field(name).map(FieldDecl::declared_type)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// True when this schema is `id` or extends it.
    pub fn is_a(&self, id: SchemaId) -> bool {
        if self.id == id {
            return true;
        }
        let mut current = self.parent.as_ref();
        while let Some(schema) = current {
            if schema.id == id {
                return true;
            }
            current = schema.parent.as_ref();
        }
        false
    }

    pub fn declared_type(self: &Arc<Self>) -> DeclaredType {
        DeclaredType::Record(self.clone())
    }

    /// An instance with every field at its default.
    pub fn new_instance(self: &Arc<Self>) -> Record {
        Record {
            schema: self.clone(),
            values: self.fields.iter().map(|f| f.default.clone()).collect(),
        }
    }

    /// An instance with the named fields set and all others at their
    /// default. Fails on the first undeclared name.
    ///
    /// Values are stored as given; conformance is enforced when the record
    /// is flattened.
    pub fn instantiate<I, K, V>(self: &Arc<Self>, fields: I) -> Result<Record, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Object>,
    {
        let mut record = self.new_instance();
        for (name, value) in fields {
            record.set(name.as_ref(), value)?;
        }
        Ok(record)
    }

    /// Rebuild an instance of this schema from a flattened map using the
    /// global converter registry.
    pub fn unflatten(self: &Arc<Self>, value: &Value) -> Result<Record, Error> {
        let declared = self.declared_type();
        match crate::engine::unflatten(&declared, value)? {
            Object::Record(record) => Ok(record),
            other => Err(Error::mismatch(&declared, &other)),
        }
    }
}

impl PartialEq for SchemaType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SchemaType {}

impl fmt::Debug for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaType")
            .field("name", &self.name)
            .field("id", &self.id.0)
            .field("fields", &self.field_names().collect::<Vec<_>>())
            .finish()
    }
}

/// Builds a [`SchemaType`].
///
/// ```rust
/// use flatrec_core::{DeclaredType, SchemaType, TypedList};
///
/// let region = SchemaType::builder("Region")
///     .field("name", DeclaredType::Str)
///     .build();
///
/// let country = SchemaType::builder("Country")
///     .field("size", DeclaredType::Int)
///     .default("pop", 7)
///     .field("regions", TypedList::of_type(region.declared_type()))
///     .build();
///
/// assert_eq!(country.field_names().collect::<Vec<_>>(), ["size", "pop", "regions"]);
/// assert_eq!(country.field_type("pop"), Some(&DeclaredType::Int));
/// ```
pub struct SchemaBuilder {
    name: String,
    parent: Option<SchemaRef>,
    fields: Vec<FieldDecl>,
}

impl SchemaBuilder {
    /// Inherit every field of `parent`. Inherited fields come first; a
    /// field redeclared here replaces the inherited one in place.
    pub fn extends(mut self, parent: &SchemaRef) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Declare a field by type. Its default is null.
    pub fn field(self, name: impl Into<String>, declared: DeclaredType) -> Self {
        self.push(name.into(), declared, Object::Null)
    }

    /// Declare a field by default literal; the declared type is the
    /// literal's runtime type.
    pub fn default(self, name: impl Into<String>, literal: impl Into<Object>) -> Self {
        let literal = literal.into();
        let declared = literal.runtime_type();
        self.push(name.into(), declared, literal)
    }

    /// Declare a field with both an explicit type and a default.
    pub fn field_with_default(
        self,
        name: impl Into<String>,
        declared: DeclaredType,
        default: impl Into<Object>,
    ) -> Self {
        self.push(name.into(), declared, default.into())
    }

    fn push(mut self, name: String, declared: DeclaredType, default: Object) -> Self {
        let decl = FieldDecl {
            name,
            declared,
            default,
        };
        match self.fields.iter_mut().find(|f| f.name == decl.name) {
            Some(existing) => *existing = decl,
            None => self.fields.push(decl),
        }
        self
    }

    pub fn build(self) -> SchemaRef {
        let mut fields = match &self.parent {
            Some(parent) => parent.fields.clone(),
            None => Vec::new(),
        };
        for decl in self.fields {
            match fields.iter_mut().find(|f| f.name == decl.name) {
                Some(existing) => *existing = decl,
                None => fields.push(decl),
            }
        }

        let index = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();

        Arc::new(SchemaType {
            id: SchemaId(NEXT_SCHEMA_ID.fetch_add(1, Ordering::Relaxed)),
            name: self.name,
            parent: self.parent,
            fields,
            index,
        })
    }
}

/// An instance of a [`SchemaType`].
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    schema: SchemaRef,
    values: Vec<Object>,
}

impl Record {
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn get(&self, name: &str) -> Option<&Object> {
        self.schema.index.get(name).map(|&i| &self.values[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Object> {
        let i = *self.schema.index.get(name)?;
        Some(&mut self.values[i])
    }

    /// Assign a declared field.
    pub fn set(&mut self, name: &str, value: impl Into<Object>) -> Result<(), Error> {
        let Some(&i) = self.schema.index.get(name) else {
            return Err(Error::UnknownField {
                schema: self.schema.name.clone(),
                field: name.to_string(),
            });
        };
        self.values[i] = value.into();
        Ok(())
    }

    /// Builder-style [`Record::set`].
    pub fn with(mut self, name: &str, value: impl Into<Object>) -> Result<Self, Error> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Reset a field to null, returning its previous value.
    pub fn take(&mut self, name: &str) -> Option<Object> {
        self.get_mut(name).map(std::mem::take)
    }

    /// `(name, value)` pairs in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Object)> {
        self.schema.field_names().zip(self.values.iter())
    }

    pub fn is_instance_of(&self, schema: &SchemaType) -> bool {
        self.schema.is_a(schema.id)
    }

    pub fn declared_type(&self) -> DeclaredType {
        self.schema.declared_type()
    }

    /// Flatten this record with the global converter registry.
    pub fn flatten(&self) -> Result<Value, Error> {
        crate::engine::flatten_as(&self.declared_type(), &Object::Record(self.clone()))
    }
}
