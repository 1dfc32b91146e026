//! The type-directed conversion engine.
//!
//! [`Engine`] walks an object tree against declared types, handing every
//! value to the converter its declared type resolves to, or to the
//! primitive path when none applies. The engine is also what converters
//! recurse through, so nesting depth is counted in one place.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::Error;
use crate::object::Object;
use crate::registry::ConvertManager;
use crate::types::DeclaredType;
use crate::value::Value;

const DEFAULT_MAX_DEPTH: usize = 128;

/// Tunables for a conversion.
///
/// Deserializable so applications can keep it in their own config files;
/// missing keys fall back to the defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Deepest nesting of records, collections and containers accepted in
    /// either direction.
    pub max_depth: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// One conversion pass over a registry.
#[derive(Clone, Copy, Debug)]
pub struct Engine<'r> {
    registry: &'r ConvertManager,
    options: EngineOptions,
    depth: usize,
}

impl<'r> Engine<'r> {
    pub fn new(registry: &'r ConvertManager) -> Self {
        Self::with_options(registry, EngineOptions::default())
    }

    pub fn with_options(registry: &'r ConvertManager, options: EngineOptions) -> Self {
        Self {
            registry,
            options,
            depth: 0,
        }
    }

    pub fn registry(&self) -> &'r ConvertManager {
        self.registry
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    fn descend(&self) -> Result<Engine<'r>, Error> {
        if self.depth >= self.options.max_depth {
            log::debug!("Refusing to nest past depth {}", self.options.max_depth);
            return Err(Error::DepthExceeded {
                limit: self.options.max_depth,
            });
        }
        Ok(Engine {
            depth: self.depth + 1,
            ..*self
        })
    }

    /// Convert `value`, declared as `declared`, into a primitive tree.
    ///
    /// Null flattens to null under every declaration. An untyped
    /// declaration dispatches on the value's runtime type.
    pub fn flatten(&self, declared: &DeclaredType, value: &Object) -> Result<Value, Error> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let declared = if declared.is_any() {
            Cow::Owned(value.runtime_type())
        } else {
            Cow::Borrowed(declared)
        };

        let inner = self.descend()?;
        match self.registry.resolve(&declared) {
            Some(converter) => {
                converter.check_type(&declared, value)?;
                converter.to_flat(&inner, &declared, value)
            }
            None => {
                check_conformance(&declared, value)?;
                inner.flatten_plain(value)
            }
        }
    }

    fn flatten_plain(&self, value: &Object) -> Result<Value, Error> {
        match value {
            Object::Null => Ok(Value::Null),
            Object::Bool(b) => Ok(Value::Bool(*b)),
            Object::Int(i) => Ok(Value::Integer(*i)),
            Object::Float(f) => Ok(Value::Float(*f)),
            Object::Str(s) => Ok(Value::String(s.clone())),
            Object::Seq(items) => items
                .iter()
                .map(|item| self.flatten(&DeclaredType::Any, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Object::Dict(entries) => entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), self.flatten(&DeclaredType::Any, v)?)))
                .collect::<Result<BTreeMap<_, _>, Error>>()
                .map(Value::Map),
            Object::List(list) => list
                .iter()
                .map(|item| self.flatten(list.element_type(), item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Object::Map(map) => map
                .iter()
                .map(|(k, v)| Ok((k.clone(), self.flatten(map.element_type(), v)?)))
                .collect::<Result<BTreeMap<_, _>, Error>>()
                .map(Value::Map),
            other => Err(Error::NoConverter {
                type_name: other.type_name(),
            }),
        }
    }

    /// Rebuild an object of type `declared` from a primitive tree.
    ///
    /// Null restores to null under every declaration. An untyped
    /// declaration restores plain values and containers.
    pub fn unflatten(&self, declared: &DeclaredType, value: &Value) -> Result<Object, Error> {
        if value.is_null() {
            return Ok(Object::Null);
        }

        let inner = self.descend()?;
        if declared.is_any() {
            return inner.restore_plain(value);
        }
        match self.registry.resolve(declared) {
            Some(converter) => {
                let object = converter.to_obj(&inner, declared, value)?;
                converter.check_type(declared, &object)?;
                Ok(object)
            }
            None => {
                let object = inner.restore_primitive(declared, value)?;
                check_conformance(declared, &object)?;
                Ok(object)
            }
        }
    }

    fn restore_plain(&self, value: &Value) -> Result<Object, Error> {
        match value {
            Value::Null => Ok(Object::Null),
            Value::Bool(b) => Ok(Object::Bool(*b)),
            Value::Integer(i) => Ok(Object::Int(*i)),
            Value::Float(f) => Ok(Object::Float(*f)),
            Value::String(s) => Ok(Object::Str(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(|item| self.unflatten(&DeclaredType::Any, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Object::Seq),
            Value::Map(entries) => entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), self.unflatten(&DeclaredType::Any, v)?)))
                .collect::<Result<BTreeMap<_, _>, Error>>()
                .map(Object::Dict),
        }
    }

    fn restore_primitive(&self, declared: &DeclaredType, value: &Value) -> Result<Object, Error> {
        match (declared, value) {
            // Integers widen to floats; nothing narrows.
            (DeclaredType::Float, Value::Integer(i)) => Ok(Object::Float(*i as f64)),
            (
                DeclaredType::Date
                | DeclaredType::DateTime
                | DeclaredType::Time
                | DeclaredType::Record(_)
                | DeclaredType::Collection(_)
                | DeclaredType::Custom(_),
                _,
            ) => Err(Error::NoConverter {
                type_name: declared.to_string(),
            }),
            _ => self.restore_plain(value),
        }
    }
}

/// The structural check: null, or a value whose runtime type `declared`
/// accepts.
pub fn check_conformance(declared: &DeclaredType, value: &Object) -> Result<(), Error> {
    if value.is_null() || declared.accepts(&value.runtime_type()) {
        Ok(())
    } else {
        Err(Error::mismatch(declared, value))
    }
}

/// Flatten `value` with the process-wide registry, dispatching on its
/// runtime type.
///
/// Plain values pass through unchanged:
///
/// ```rust
/// use flatrec_core::{flatten, Object, Value};
///
/// assert_eq!(flatten(&Object::from("foobar")).unwrap(), Value::from("foobar"));
/// ```
pub fn flatten(value: &Object) -> Result<Value, Error> {
    flatten_as(&DeclaredType::Any, value)
}

/// Flatten `value` as `declared` with the process-wide registry.
pub fn flatten_as(declared: &DeclaredType, value: &Object) -> Result<Value, Error> {
    let registry = ConvertManager::global();
    Engine::new(&registry).flatten(declared, value)
}

/// Unflatten `value` into `declared` with the process-wide registry.
pub fn unflatten(declared: &DeclaredType, value: &Value) -> Result<Object, Error> {
    let registry = ConvertManager::global();
    Engine::new(&registry).unflatten(declared, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::TypedList;
    use crate::schema::SchemaType;
    use crate::types::CustomType;
    use chrono::NaiveDate;

    fn nested_seq(depth: usize) -> Object {
        let mut object = Object::Int(0);
        for _ in 0..depth {
            object = Object::Seq(vec![object]);
        }
        object
    }

    #[test]
    fn any_dispatches_on_runtime_type() {
        let registry = ConvertManager::new();
        let engine = Engine::new(&registry);
        let date = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();

        assert_eq!(
            engine.flatten(&DeclaredType::Any, &Object::Date(date)).unwrap(),
            Value::from("1999-12-31")
        );
        assert_eq!(
            engine
                .flatten(
                    &DeclaredType::Any,
                    &Object::List(TypedList::from_items(DeclaredType::Int, [1, 2]))
                )
                .unwrap(),
            Value::from(vec![1, 2])
        );
    }

    #[test]
    fn untyped_unflatten_restores_plain_containers() {
        let registry = ConvertManager::new();
        let engine = Engine::new(&registry);
        let flat: Value = [("a", Value::from(vec![Value::from(1), Value::from("x")]))]
            .into_iter()
            .collect();

        let restored = engine.unflatten(&DeclaredType::Any, &flat).unwrap();
        let expected: Object = [("a", Object::from(vec![Object::from(1), Object::from("x")]))]
            .into_iter()
            .collect();
        assert_eq!(restored, expected);
    }

    #[test]
    fn integers_widen_to_float_only_on_unflatten() {
        let registry = ConvertManager::new();
        let engine = Engine::new(&registry);

        assert_eq!(
            engine.unflatten(&DeclaredType::Float, &Value::Integer(3)).unwrap(),
            Object::Float(3.0)
        );
        assert!(engine
            .unflatten(&DeclaredType::Int, &Value::Float(3.0))
            .unwrap_err()
            .is_type_mismatch());
        assert!(engine
            .flatten(&DeclaredType::Float, &Object::Int(3))
            .unwrap_err()
            .is_type_mismatch());
    }

    #[test]
    fn null_is_accepted_everywhere() {
        let registry = ConvertManager::new();
        let engine = Engine::new(&registry);
        let schema = SchemaType::builder("S").build();

        for declared in [
            DeclaredType::Int,
            DeclaredType::Date,
            schema.declared_type(),
            TypedList::of_type(DeclaredType::Str),
        ] {
            assert_eq!(engine.flatten(&declared, &Object::Null).unwrap(), Value::Null);
            assert_eq!(engine.unflatten(&declared, &Value::Null).unwrap(), Object::Null);
        }
    }

    #[test]
    fn custom_values_without_converter_fail() {
        let registry = ConvertManager::new();
        let engine = Engine::new(&registry);
        let ty = CustomType::new("Opaque");

        let err = engine
            .flatten(&DeclaredType::Any, &Object::custom(&ty, 5u8))
            .unwrap_err();
        assert_eq!(
            err,
            Error::NoConverter {
                type_name: "Opaque".to_string()
            }
        );
        let err = engine
            .unflatten(&ty.declared_type(), &Value::Integer(5))
            .unwrap_err();
        assert!(matches!(err, Error::NoConverter { .. }));
    }

    #[test]
    fn empty_registry_has_no_temporal_support() {
        let registry = ConvertManager::empty();
        let engine = Engine::new(&registry);
        let date = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();

        assert!(matches!(
            engine.flatten(&DeclaredType::Date, &Object::Date(date)),
            Err(Error::NoConverter { .. })
        ));
        assert_eq!(
            engine
                .flatten(&DeclaredType::Any, &Object::from(vec!["a", "b"]))
                .unwrap(),
            Value::from(vec!["a", "b"])
        );
    }

    #[test]
    fn depth_limit_applies_in_both_directions() {
        let registry = ConvertManager::new();
        let deep = nested_seq(DEFAULT_MAX_DEPTH + 10);

        let err = Engine::new(&registry)
            .flatten(&DeclaredType::Any, &deep)
            .unwrap_err();
        assert_eq!(
            err,
            Error::DepthExceeded {
                limit: DEFAULT_MAX_DEPTH
            }
        );

        let roomy = Engine::with_options(&registry, EngineOptions { max_depth: 512 });
        assert_eq!(roomy.options().max_depth, 512);
        assert!(std::ptr::eq(roomy.registry(), &registry));
        let flat = roomy.flatten(&DeclaredType::Any, &deep).unwrap();
        assert_eq!(roomy.unflatten(&DeclaredType::Any, &flat).unwrap(), deep);

        let err = Engine::new(&registry)
            .unflatten(&DeclaredType::Any, &flat)
            .unwrap_err();
        assert!(matches!(err, Error::DepthExceeded { .. }));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: EngineOptions = serde_json::from_str(r#"{"max_depth": 4}"#).unwrap();
        assert_eq!(options.max_depth, 4);

        let options: EngineOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, EngineOptions::default());
    }

    #[test]
    fn conformance() {
        assert!(check_conformance(&DeclaredType::Str, &Object::from("x")).is_ok());
        assert!(check_conformance(&DeclaredType::Str, &Object::Null).is_ok());
        assert_eq!(
            check_conformance(&DeclaredType::Str, &Object::Int(42)),
            Err(Error::TypeMismatch {
                expected: "str".to_string(),
                found: "int".to_string(),
            })
        );
    }
}
