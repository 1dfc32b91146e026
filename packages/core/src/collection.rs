//! Typed collections: lists and maps tagged with one element type.
//!
//! The element tag lives on each instance and is fixed at construction.
//! Two collections built from different `of_type` parametrizations never
//! share any state.

use std::collections::BTreeMap;

use crate::object::Object;
use crate::types::{CollectionKind, CollectionType, DeclaredType};

/// An ordered sequence whose elements are governed by one declared type.
///
/// ```rust
/// use flatrec_core::{DeclaredType, Object, TypedList};
///
/// let declared = TypedList::of_type(DeclaredType::Int);
/// let mut list = TypedList::new(DeclaredType::Int);
/// list.push(7);
///
/// assert_eq!(Object::from(list).runtime_type(), declared);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct TypedList {
    element: DeclaredType,
    items: Vec<Object>,
}

impl TypedList {
    /// A new typed-list declaration binding `element`.
    pub fn of_type(element: DeclaredType) -> DeclaredType {
        DeclaredType::Collection(CollectionType::new(CollectionKind::List, element))
    }

    pub fn new(element: DeclaredType) -> Self {
        Self {
            element,
            items: Vec::new(),
        }
    }

    pub fn from_items<I, T>(element: DeclaredType, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Object>,
    {
        Self {
            element,
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    pub fn element_type(&self) -> &DeclaredType {
        &self.element
    }

    pub fn push(&mut self, item: impl Into<Object>) {
        self.items.push(item.into());
    }

    pub fn get(&self, index: usize) -> Option<&Object> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Object> {
        self.items.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Object> {
        self.items.iter()
    }

    pub fn items(&self) -> &[Object] {
        &self.items
    }
}

impl<'a> IntoIterator for &'a TypedList {
    type Item = &'a Object;
    type IntoIter = std::slice::Iter<'a, Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// A key-ordered map whose values are governed by one declared type.
#[derive(Clone, Debug, PartialEq)]
pub struct TypedMap {
    element: DeclaredType,
    entries: BTreeMap<String, Object>,
}

impl TypedMap {
    /// A new typed-map declaration binding `element`.
    pub fn of_type(element: DeclaredType) -> DeclaredType {
        DeclaredType::Collection(CollectionType::new(CollectionKind::Map, element))
    }

    pub fn new(element: DeclaredType) -> Self {
        Self {
            element,
            entries: BTreeMap::new(),
        }
    }

    pub fn from_entries<I, K, V>(element: DeclaredType, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Object>,
    {
        Self {
            element,
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn element_type(&self) -> &DeclaredType {
        &self.element
    }

    /// Insert a value, returning the one it replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Object>) -> Option<Object> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Object> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Object> {
        self.entries.get_mut(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Object> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::collections::btree_map::Iter<'_, String, Object> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a TypedMap {
    type Item = (&'a String, &'a Object);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
