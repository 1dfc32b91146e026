//! The converter registry.
//!
//! A [`ConvertManager`] maps type keys to converters. Exact entries match a
//! declared type's own key; inexact entries match any declared type that
//! is-a the registered key, and are consulted in registration order only
//! when no exact entry applies.
//!
//! A process-wide registry backs the free [`flatten`](crate::flatten) and
//! [`unflatten`](crate::unflatten) functions. It is replaced copy-on-write,
//! so a conversion in flight keeps the registry it started with.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use lazy_static::lazy_static;

use crate::converter::{
    Converter, DateConverter, DateTimeConverter, RecordConverter, TimeConverter,
    TypedListConverter, TypedMapConverter,
};
use crate::engine::Engine;
use crate::error::Error;
use crate::object::Object;
use crate::types::{DeclaredType, TypeKey};
use crate::value::Value;

/// How a registry entry matches declared types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MatchMode {
    /// Only the registered key itself.
    Exact,
    /// The registered key and everything that is-a it.
    Inexact,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Exact => write!(f, "exact"),
            MatchMode::Inexact => write!(f, "inexact"),
        }
    }
}

/// A set of converters keyed by declared type.
#[derive(Clone, Default)]
pub struct ConvertManager {
    exact: HashMap<TypeKey, Arc<dyn Converter>>,
    inexact: Vec<(TypeKey, Arc<dyn Converter>)>,
}

impl ConvertManager {
    /// A registry with no converters at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry preloaded with the built-in converters.
    pub fn new() -> Self {
        let mut exact: HashMap<TypeKey, Arc<dyn Converter>> = HashMap::new();
        exact.insert(TypeKey::Date, Arc::new(DateConverter));
        exact.insert(TypeKey::DateTime, Arc::new(DateTimeConverter));
        exact.insert(TypeKey::Time, Arc::new(TimeConverter));
        exact.insert(TypeKey::TypedList, Arc::new(TypedListConverter));
        exact.insert(TypeKey::TypedMap, Arc::new(TypedMapConverter));

        let record: Arc<dyn Converter> = Arc::new(RecordConverter);
        Self {
            exact,
            inexact: vec![(TypeKey::RecordBase, record)],
        }
    }

    /// Register `converter` for `key`, replacing any converter previously
    /// registered for the same key in either mode.
    pub fn register(
        &mut self,
        key: TypeKey,
        converter: Arc<dyn Converter>,
        mode: MatchMode,
    ) -> Result<(), Error> {
        if key == TypeKey::Any {
            return Err(Error::ConverterContract {
                message: "cannot register a converter for the untyped declaration".to_string(),
            });
        }
        let capabilities = converter.capabilities();
        if !capabilities.is_complete() {
            return Err(Error::ConverterContract {
                message: format!(
                    "converter for {} must implement both directions (to_flat: {}, to_obj: {})",
                    key, capabilities.to_flat, capabilities.to_obj
                ),
            });
        }

        log::debug!("Registering {} converter for {}", mode, key);
        self.exact.remove(&key);
        match mode {
            MatchMode::Exact => {
                self.inexact.retain(|(k, _)| *k != key);
                self.exact.insert(key, converter);
            }
            MatchMode::Inexact => {
                // A replaced inexact entry keeps its place in the lookup order.
                if let Some(slot) = self.inexact.iter_mut().find(|(k, _)| *k == key) {
                    slot.1 = converter;
                } else {
                    self.inexact.push((key, converter));
                }
            }
        }
        Ok(())
    }

    /// Remove the converters registered for `key`, returning the exact one
    /// if there was one, else the inexact one.
    pub fn unregister(&mut self, key: &TypeKey) -> Option<Arc<dyn Converter>> {
        let exact = self.exact.remove(key);
        let inexact = self
            .inexact
            .iter()
            .position(|(k, _)| k == key)
            .map(|i| self.inexact.remove(i).1);
        if exact.is_some() || inexact.is_some() {
            log::debug!("Unregistered converter for {}", key);
        }
        exact.or(inexact)
    }

    /// Snapshot of the process-wide registry.
    pub fn global() -> Arc<ConvertManager> {
        GLOBAL
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_registered(&self, key: &TypeKey) -> bool {
        self.exact.contains_key(key) || self.inexact.iter().any(|(k, _)| k == key)
    }

    /// The converter that governs `declared`, if any.
    pub fn resolve(&self, declared: &DeclaredType) -> Option<&dyn Converter> {
        let key = declared.key();
        if let Some(converter) = self.exact.get(&key) {
            log::trace!("Resolved {} to exact converter", declared);
            return Some(converter.as_ref());
        }
        self.inexact
            .iter()
            .find(|(k, _)| declared.is_a(k))
            .map(|(k, converter)| {
                log::trace!("Resolved {} to inexact converter for {}", declared, k);
                converter.as_ref()
            })
    }

    /// Flatten `value` as `declared` with this registry.
    pub fn to_flat(&self, declared: &DeclaredType, value: &Object) -> Result<Value, Error> {
        Engine::new(self).flatten(declared, value)
    }

    /// Unflatten `value` into `declared` with this registry.
    pub fn to_obj(&self, declared: &DeclaredType, value: &Value) -> Result<Object, Error> {
        Engine::new(self).unflatten(declared, value)
    }

    /// Check `value` against `declared`, using the governing converter's
    /// check when there is one.
    pub fn check_type(&self, declared: &DeclaredType, value: &Object) -> Result<(), Error> {
        match self.resolve(declared) {
            Some(converter) => converter.check_type(declared, value),
            None => crate::engine::check_conformance(declared, value),
        }
    }
}

impl fmt::Debug for ConvertManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut exact: Vec<&TypeKey> = self.exact.keys().collect();
        exact.sort();
        let inexact: Vec<&TypeKey> = self.inexact.iter().map(|(k, _)| k).collect();
        f.debug_struct("ConvertManager")
            .field("exact", &exact)
            .field("inexact", &inexact)
            .finish()
    }
}

lazy_static! {
    static ref GLOBAL: RwLock<Arc<ConvertManager>> = RwLock::new(Arc::new(ConvertManager::new()));
}

/// Register a converter in the process-wide registry.
pub fn register(
    key: TypeKey,
    converter: impl Converter + 'static,
    mode: MatchMode,
) -> Result<(), Error> {
    let mut guard = GLOBAL.write().unwrap_or_else(PoisonError::into_inner);
    let mut next = ConvertManager::clone(&guard);
    next.register(key, Arc::new(converter), mode)?;
    *guard = Arc::new(next);
    Ok(())
}

/// Remove a converter from the process-wide registry.
pub fn unregister(key: &TypeKey) -> Option<Arc<dyn Converter>> {
    let mut guard = GLOBAL.write().unwrap_or_else(PoisonError::into_inner);
    let mut next = ConvertManager::clone(&guard);
    let removed = next.unregister(key);
    *guard = Arc::new(next);
    removed
}
