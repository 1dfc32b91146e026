//! Declared types and the keys the converter registry dispatches on.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::schema::{SchemaId, SchemaRef};

static NEXT_CUSTOM_ID: AtomicU64 = AtomicU64::new(1);

/// The two built-in typed container kinds.
///
/// Kind comparison is how a list parametrized with one element type and a
/// list parametrized with another both satisfy "is a typed list".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollectionKind {
    List,
    Map,
}

impl CollectionKind {
    /// Registry key shared by every parametrization of this kind.
    pub fn key(self) -> TypeKey {
        match self {
            CollectionKind::List => TypeKey::TypedList,
            CollectionKind::Map => TypeKey::TypedMap,
        }
    }

    fn name(self) -> &'static str {
        match self {
            CollectionKind::List => "TypedList",
            CollectionKind::Map => "TypedMap",
        }
    }
}

/// A typed collection declaration: a kind plus the element type it binds.
///
/// Each value is independent; building a `TypedList` of `Region` never
/// touches any other parametrization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionType {
    kind: CollectionKind,
    element: Arc<DeclaredType>,
}

impl CollectionType {
    pub fn new(kind: CollectionKind, element: DeclaredType) -> Self {
        Self {
            kind,
            element: Arc::new(element),
        }
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    pub fn element_type(&self) -> &DeclaredType {
        &self.element
    }
}

/// Identity of a user-defined opaque type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CustomId(u64);

struct CustomInner {
    id: CustomId,
    name: String,
    parent: Option<CustomType>,
}

/// An opaque user type that participates in flattening through a
/// registered converter.
///
/// Custom types form families: a type created with [`CustomType::extending`]
/// is-a its parent, so an inexact registration on the parent covers it.
#[derive(Clone)]
pub struct CustomType(Arc<CustomInner>);

impl CustomType {
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(name.into(), None)
    }

    pub fn extending(name: impl Into<String>, parent: &CustomType) -> Self {
        Self::build(name.into(), Some(parent.clone()))
    }

    fn build(name: String, parent: Option<CustomType>) -> Self {
        let id = CustomId(NEXT_CUSTOM_ID.fetch_add(1, Ordering::Relaxed));
        CustomType(Arc::new(CustomInner { id, name, parent }))
    }

    pub fn id(&self) -> CustomId {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn parent(&self) -> Option<&CustomType> {
        self.0.parent.as_ref()
    }

    pub fn key(&self) -> TypeKey {
        TypeKey::Custom(self.id())
    }

    /// True when this type is `id` or descends from it.
    pub fn is_a(&self, id: CustomId) -> bool {
        let mut current = Some(self);
        while let Some(ty) = current {
            if ty.id() == id {
                return true;
            }
            current = ty.parent();
        }
        false
    }

    pub fn declared_type(&self) -> DeclaredType {
        DeclaredType::Custom(self.clone())
    }
}

impl PartialEq for CustomType {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for CustomType {}

impl fmt::Debug for CustomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CustomType({}#{})", self.name(), self.id().0)
    }
}

/// Registry key of a declared type.
///
/// Collections key on their kind, not on their element type; records key
/// on their schema identity and additionally match `RecordBase` inexactly.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeKey {
    Any,
    Bool,
    Int,
    Float,
    Str,
    Seq,
    Dict,
    Date,
    DateTime,
    Time,
    /// Abstract base of every record schema.
    RecordBase,
    Record(SchemaId),
    TypedList,
    TypedMap,
    Custom(CustomId),
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKey::Any => write!(f, "any"),
            TypeKey::Bool => write!(f, "bool"),
            TypeKey::Int => write!(f, "int"),
            TypeKey::Float => write!(f, "float"),
            TypeKey::Str => write!(f, "str"),
            TypeKey::Seq => write!(f, "list"),
            TypeKey::Dict => write!(f, "dict"),
            TypeKey::Date => write!(f, "date"),
            TypeKey::DateTime => write!(f, "datetime"),
            TypeKey::Time => write!(f, "time"),
            TypeKey::RecordBase => write!(f, "record"),
            TypeKey::Record(id) => write!(f, "record#{}", id),
            TypeKey::TypedList => write!(f, "TypedList"),
            TypeKey::TypedMap => write!(f, "TypedMap"),
            TypeKey::Custom(id) => write!(f, "custom#{}", id.0),
        }
    }
}

/// The type attached to a schema field.
///
/// `Any` is the untyped declaration: it accepts every value and dispatches
/// on the value's runtime type.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DeclaredType {
    #[default]
    Any,
    Bool,
    Int,
    Float,
    Str,
    /// Plain, ungoverned sequence.
    Seq,
    /// Plain, ungoverned string-keyed map.
    Dict,
    Date,
    DateTime,
    Time,
    Record(SchemaRef),
    Collection(CollectionType),
    Custom(CustomType),
}

impl DeclaredType {
    pub fn record(schema: &SchemaRef) -> Self {
        DeclaredType::Record(schema.clone())
    }

    pub fn is_any(&self) -> bool {
        matches!(self, DeclaredType::Any)
    }

    pub fn key(&self) -> TypeKey {
        match self {
            DeclaredType::Any => TypeKey::Any,
            DeclaredType::Bool => TypeKey::Bool,
            DeclaredType::Int => TypeKey::Int,
            DeclaredType::Float => TypeKey::Float,
            DeclaredType::Str => TypeKey::Str,
            DeclaredType::Seq => TypeKey::Seq,
            DeclaredType::Dict => TypeKey::Dict,
            DeclaredType::Date => TypeKey::Date,
            DeclaredType::DateTime => TypeKey::DateTime,
            DeclaredType::Time => TypeKey::Time,
            DeclaredType::Record(schema) => schema.key(),
            DeclaredType::Collection(collection) => collection.kind().key(),
            DeclaredType::Custom(ty) => ty.key(),
        }
    }

    /// Subtype test used by inexact registry entries.
    pub fn is_a(&self, key: &TypeKey) -> bool {
        if self.key() == *key {
            return true;
        }
        match (self, key) {
            (DeclaredType::Record(_), TypeKey::RecordBase) => true,
            (DeclaredType::Record(schema), TypeKey::Record(id)) => schema.is_a(*id),
            (DeclaredType::Custom(ty), TypeKey::Custom(id)) => ty.is_a(*id),
            _ => false,
        }
    }

    /// Whether a value of runtime type `actual` satisfies this declaration.
    ///
    /// Typed collections only compare kinds here; element tags are checked
    /// by the collection converters. A plain sequence or map satisfies a
    /// typed collection of the matching kind and vice versa.
    pub fn accepts(&self, actual: &DeclaredType) -> bool {
        use DeclaredType::*;

        match (self, actual) {
            (Any, _) => true,
            (Record(expected), Record(found)) => found.is_a(expected.id()),
            (Custom(expected), Custom(found)) => found.is_a(expected.id()),
            (Collection(expected), Collection(found)) => expected.kind() == found.kind(),
            (Collection(expected), Seq) | (Seq, Collection(expected)) => {
                expected.kind() == CollectionKind::List
            }
            (Collection(expected), Dict) | (Dict, Collection(expected)) => {
                expected.kind() == CollectionKind::Map
            }
            (expected, found) => expected.key() == found.key(),
        }
    }

    /// The collection capability of this declaration, if any.
    pub fn collection_kind(&self) -> Option<CollectionKind> {
        match self {
            DeclaredType::Collection(collection) => Some(collection.kind()),
            _ => None,
        }
    }

    pub fn element_type(&self) -> Option<&DeclaredType> {
        match self {
            DeclaredType::Collection(collection) => Some(collection.element_type()),
            _ => None,
        }
    }

    pub fn as_schema(&self) -> Option<&SchemaRef> {
        match self {
            DeclaredType::Record(schema) => Some(schema),
            _ => None,
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclaredType::Record(schema) => write!(f, "{}", schema.name()),
            DeclaredType::Collection(collection) => write!(
                f,
                "{}<{}>",
                collection.kind().name(),
                collection.element_type()
            ),
            DeclaredType::Custom(ty) => write!(f, "{}", ty.name()),
            other => write!(f, "{}", other.key()),
        }
    }
}
