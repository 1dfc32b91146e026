//! Runtime values held by record fields.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::collection::{TypedList, TypedMap};
use crate::schema::Record;
use crate::types::{CollectionKind, CollectionType, CustomType, DeclaredType};

/// Payload of a custom value.
///
/// Implemented for every `Debug + PartialEq` type that can cross threads,
/// so user types never implement it by hand.
pub trait CustomObject: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn dyn_eq(&self, other: &dyn CustomObject) -> bool;
}

impl<T: Any + fmt::Debug + PartialEq + Send + Sync> CustomObject for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn CustomObject) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| other == self)
    }
}

/// A value of a [`CustomType`]: the type tag plus a shared opaque payload.
#[derive(Clone, Debug)]
pub struct CustomValue {
    ty: CustomType,
    payload: Arc<dyn CustomObject>,
}

impl CustomValue {
    pub fn new<T: CustomObject>(ty: &CustomType, payload: T) -> Self {
        Self {
            ty: ty.clone(),
            payload: Arc::new(payload),
        }
    }

    pub fn custom_type(&self) -> &CustomType {
        &self.ty
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.as_any().downcast_ref::<T>()
    }
}

impl PartialEq for CustomValue {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty && self.payload.dyn_eq(other.payload.as_ref())
    }
}

/// The value held by a record field, collection slot or plain container.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Object {
    /// Unset or explicitly null.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    Record(Record),
    List(TypedList),
    Map(TypedMap),
    /// Plain sequence, not governed by an element type.
    Seq(Vec<Object>),
    /// Plain string-keyed map, not governed by an element type.
    Dict(BTreeMap<String, Object>),
    Custom(CustomValue),
}

impl Object {
    pub fn custom<T: CustomObject>(ty: &CustomType, payload: T) -> Self {
        Object::Custom(CustomValue::new(ty, payload))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    /// The declared type this value would satisfy exactly.
    ///
    /// Null has no type of its own and reports `Any`.
    pub fn runtime_type(&self) -> DeclaredType {
        match self {
            Object::Null => DeclaredType::Any,
            Object::Bool(_) => DeclaredType::Bool,
            Object::Int(_) => DeclaredType::Int,
            Object::Float(_) => DeclaredType::Float,
            Object::Str(_) => DeclaredType::Str,
            Object::Date(_) => DeclaredType::Date,
            Object::DateTime(_) => DeclaredType::DateTime,
            Object::Time(_) => DeclaredType::Time,
            Object::Record(record) => DeclaredType::record(record.schema()),
            Object::List(list) => DeclaredType::Collection(CollectionType::new(
                CollectionKind::List,
                list.element_type().clone(),
            )),
            Object::Map(map) => DeclaredType::Collection(CollectionType::new(
                CollectionKind::Map,
                map.element_type().clone(),
            )),
            Object::Seq(_) => DeclaredType::Seq,
            Object::Dict(_) => DeclaredType::Dict,
            Object::Custom(custom) => custom.custom_type().declared_type(),
        }
    }

    /// Name of the runtime type, used in error messages.
    pub fn type_name(&self) -> String {
        match self {
            Object::Null => "null".to_string(),
            other => other.runtime_type().to_string(),
        }
    }

    /// True when the tree holds only null, bool, numbers, strings and
    /// plain containers of those.
    pub fn is_plain(&self) -> bool {
        match self {
            Object::Null | Object::Bool(_) | Object::Int(_) | Object::Str(_) => true,
            Object::Float(f) => f.is_finite(),
            Object::Seq(items) => items.iter().all(Object::is_plain),
            Object::Dict(map) => map.values().all(Object::is_plain),
            _ => false,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Object::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Object::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Object::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Object::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Object::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&TypedList> {
        match self {
            Object::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&TypedMap> {
        match self {
            Object::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_custom<T: Any>(&self) -> Option<&T> {
        match self {
            Object::Custom(custom) => custom.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl From<bool> for Object {
    fn from(v: bool) -> Self {
        Object::Bool(v)
    }
}

impl From<i64> for Object {
    fn from(v: i64) -> Self {
        Object::Int(v)
    }
}

impl From<i32> for Object {
    fn from(v: i32) -> Self {
        Object::Int(v as i64)
    }
}

impl From<f64> for Object {
    fn from(v: f64) -> Self {
        Object::Float(v)
    }
}

impl From<String> for Object {
    fn from(v: String) -> Self {
        Object::Str(v)
    }
}

impl From<&str> for Object {
    fn from(v: &str) -> Self {
        Object::Str(v.to_string())
    }
}

impl From<NaiveDate> for Object {
    fn from(v: NaiveDate) -> Self {
        Object::Date(v)
    }
}

impl From<NaiveDateTime> for Object {
    fn from(v: NaiveDateTime) -> Self {
        Object::DateTime(v)
    }
}

impl From<NaiveTime> for Object {
    fn from(v: NaiveTime) -> Self {
        Object::Time(v)
    }
}

impl From<Record> for Object {
    fn from(v: Record) -> Self {
        Object::Record(v)
    }
}

impl From<TypedList> for Object {
    fn from(v: TypedList) -> Self {
        Object::List(v)
    }
}

impl From<TypedMap> for Object {
    fn from(v: TypedMap) -> Self {
        Object::Map(v)
    }
}

impl From<CustomValue> for Object {
    fn from(v: CustomValue) -> Self {
        Object::Custom(v)
    }
}

impl<T: Into<Object>> From<Option<T>> for Object {
    fn from(v: Option<T>) -> Self {
        v.map_or(Object::Null, Into::into)
    }
}

impl<T: Into<Object>> From<Vec<T>> for Object {
    fn from(v: Vec<T>) -> Self {
        Object::Seq(v.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<Object>> FromIterator<(K, V)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Object::Dict(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
