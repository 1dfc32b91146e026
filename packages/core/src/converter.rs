//! The converter contract and the built-in converters.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::collection::{TypedList, TypedMap};
use crate::engine::{check_conformance, Engine};
use crate::error::Error;
use crate::object::Object;
use crate::types::{CollectionKind, DeclaredType};
use crate::value::Value;

/// Which directions a converter supports.
///
/// The registry only accepts converters that cover both directions; the
/// flag exists so a partially implemented converter is rejected at
/// registration instead of failing halfway through a conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub to_flat: bool,
    pub to_obj: bool,
}

impl Capabilities {
    pub const FULL: Capabilities = Capabilities {
        to_flat: true,
        to_obj: true,
    };

    pub const FLATTEN_ONLY: Capabilities = Capabilities {
        to_flat: true,
        to_obj: false,
    };

    pub const RESTORE_ONLY: Capabilities = Capabilities {
        to_flat: false,
        to_obj: true,
    };

    pub fn is_complete(&self) -> bool {
        self.to_flat && self.to_obj
    }
}

/// Type-directed conversion for one declared type or type family.
///
/// Converters are stateless and shared through the registry. Nested values
/// go back through `engine` so that they are dispatched and checked like
/// any other field.
///
/// # Implementing a custom converter
///
/// ```rust
/// use flatrec_core::{
///     Converter, ConvertManager, CustomType, DeclaredType, Engine, Error, MatchMode, Object,
///     Value,
/// };
/// use std::sync::Arc;
///
/// #[derive(Debug, PartialEq)]
/// struct Celsius(f64);
///
/// struct CelsiusConverter;
///
/// impl Converter for CelsiusConverter {
///     fn to_flat(
///         &self,
///         _: &Engine<'_>,
///         declared: &DeclaredType,
///         value: &Object,
///     ) -> Result<Value, Error> {
///         match value.as_custom::<Celsius>() {
///             Some(c) => Ok(Value::Float(c.0)),
///             None => Err(Error::mismatch(declared, value)),
///         }
///     }
///
///     fn to_obj(
///         &self,
///         _: &Engine<'_>,
///         declared: &DeclaredType,
///         value: &Value,
///     ) -> Result<Object, Error> {
///         let DeclaredType::Custom(ty) = declared else {
///             return Err(Error::mismatch_value(declared, value));
///         };
///         match value {
///             Value::Float(f) => Ok(Object::custom(ty, Celsius(*f))),
///             other => Err(Error::mismatch_value(declared, other)),
///         }
///     }
/// }
///
/// let celsius = CustomType::new("Celsius");
/// let mut registry = ConvertManager::new();
/// registry
///     .register(celsius.key(), Arc::new(CelsiusConverter), MatchMode::Exact)
///     .unwrap();
///
/// let engine = Engine::new(&registry);
/// let flat = engine
///     .flatten(&celsius.declared_type(), &Object::custom(&celsius, Celsius(21.5)))
///     .unwrap();
/// assert_eq!(flat, Value::Float(21.5));
/// ```
pub trait Converter: Send + Sync {
    /// Verify that `value` conforms to `declared`.
    ///
    /// Defaults to the structural check: null, or a value whose runtime
    /// type the declaration accepts.
    fn check_type(&self, declared: &DeclaredType, value: &Object) -> Result<(), Error> {
        check_conformance(declared, value)
    }

    /// Convert `value` into its primitive form.
    fn to_flat(
        &self,
        engine: &Engine<'_>,
        declared: &DeclaredType,
        value: &Object,
    ) -> Result<Value, Error>;

    /// Rebuild an object of type `declared` from its primitive form.
    fn to_obj(
        &self,
        engine: &Engine<'_>,
        declared: &DeclaredType,
        value: &Value,
    ) -> Result<Object, Error>;

    fn capabilities(&self) -> Capabilities {
        Capabilities::FULL
    }
}

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";
const TIME_FORMAT: &str = "%H:%M:%S%.6f";

// Parsing uses the flexible `%.f`; exactly six fractional digits are
// enforced here.
const DATETIME_PARSE: &str = "%Y-%m-%dT%H:%M:%S%.f";
const TIME_PARSE: &str = "%H:%M:%S%.f";

fn has_micros(s: &str) -> bool {
    s.rsplit_once('.')
        .is_some_and(|(_, frac)| frac.len() == 6 && frac.bytes().all(|b| b.is_ascii_digit()))
}

/// `datetime.date` as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateConverter;

impl Converter for DateConverter {
    fn to_flat(
        &self,
        _: &Engine<'_>,
        declared: &DeclaredType,
        value: &Object,
    ) -> Result<Value, Error> {
        match value {
            Object::Null => Ok(Value::Null),
            Object::Date(date) => Ok(Value::String(date.format(DATE_FORMAT).to_string())),
            other => Err(Error::mismatch(declared, other)),
        }
    }

    fn to_obj(&self, _: &Engine<'_>, _: &DeclaredType, value: &Value) -> Result<Object, Error> {
        match value {
            Value::Null => Ok(Object::Null),
            Value::String(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
                .map(Object::Date)
                .map_err(|_| Error::format("date", value)),
            other => Err(Error::format("date", other)),
        }
    }
}

/// Date and time of day as `YYYY-MM-DDTHH:MM:SS.ffffff`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeConverter;

impl Converter for DateTimeConverter {
    fn to_flat(
        &self,
        _: &Engine<'_>,
        declared: &DeclaredType,
        value: &Object,
    ) -> Result<Value, Error> {
        match value {
            Object::Null => Ok(Value::Null),
            Object::DateTime(dt) => Ok(Value::String(dt.format(DATETIME_FORMAT).to_string())),
            other => Err(Error::mismatch(declared, other)),
        }
    }

    fn to_obj(&self, _: &Engine<'_>, _: &DeclaredType, value: &Value) -> Result<Object, Error> {
        match value {
            Value::Null => Ok(Object::Null),
            Value::String(s) if has_micros(s) => NaiveDateTime::parse_from_str(s, DATETIME_PARSE)
                .map(Object::DateTime)
                .map_err(|_| Error::format("datetime", value)),
            other => Err(Error::format("datetime", other)),
        }
    }
}

/// Time of day as `HH:MM:SS.ffffff`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeConverter;

impl Converter for TimeConverter {
    fn to_flat(
        &self,
        _: &Engine<'_>,
        declared: &DeclaredType,
        value: &Object,
    ) -> Result<Value, Error> {
        match value {
            Object::Null => Ok(Value::Null),
            Object::Time(time) => Ok(Value::String(time.format(TIME_FORMAT).to_string())),
            other => Err(Error::mismatch(declared, other)),
        }
    }

    fn to_obj(&self, _: &Engine<'_>, _: &DeclaredType, value: &Value) -> Result<Object, Error> {
        match value {
            Value::Null => Ok(Object::Null),
            Value::String(s) if has_micros(s) => NaiveTime::parse_from_str(s, TIME_PARSE)
                .map(Object::Time)
                .map_err(|_| Error::format("time", value)),
            other => Err(Error::format("time", other)),
        }
    }
}

/// Records of any schema. Registered inexactly on `TypeKey::RecordBase`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordConverter;

impl Converter for RecordConverter {
    fn check_type(&self, declared: &DeclaredType, value: &Object) -> Result<(), Error> {
        match (declared, value) {
            (_, Object::Null) => Ok(()),
            (DeclaredType::Record(schema), Object::Record(record))
                if record.is_instance_of(schema) =>
            {
                Ok(())
            }
            _ => Err(Error::mismatch(declared, value)),
        }
    }

    fn to_flat(
        &self,
        engine: &Engine<'_>,
        declared: &DeclaredType,
        value: &Object,
    ) -> Result<Value, Error> {
        let (Some(schema), Object::Record(record)) = (declared.as_schema(), value) else {
            return match value {
                Object::Null => Ok(Value::Null),
                other => Err(Error::mismatch(declared, other)),
            };
        };

        // Fields come from the declared schema, in declaration order.
        let mut flat = BTreeMap::new();
        for field in schema.fields() {
            let current = record.get(field.name()).unwrap_or(&Object::Null);
            let value = engine.flatten(field.declared_type(), current)?;
            flat.insert(field.name().to_string(), value);
        }
        Ok(Value::Map(flat))
    }

    fn to_obj(
        &self,
        engine: &Engine<'_>,
        declared: &DeclaredType,
        value: &Value,
    ) -> Result<Object, Error> {
        let schema = declared
            .as_schema()
            .ok_or_else(|| Error::mismatch_value(declared, value))?;
        let map = match value {
            Value::Null => return Ok(Object::Null),
            Value::Map(map) => map,
            other => return Err(Error::mismatch_value(declared, other)),
        };

        let mut record = schema.new_instance();
        for field in schema.fields() {
            // A missing key keeps the field's default.
            if let Some(flat) = map.get(field.name()) {
                let object = engine.unflatten(field.declared_type(), flat)?;
                record.set(field.name(), object)?;
            }
        }
        Ok(Object::Record(record))
    }
}

/// Check a container's own element tag against the element type the field
/// declares. An untyped declaration accepts any tag.
fn check_element_tag(
    declared: &DeclaredType,
    tag: &DeclaredType,
    value: &Object,
) -> Result<(), Error> {
    match declared.element_type() {
        Some(expected) if !expected.accepts(tag) => Err(Error::mismatch(declared, value)),
        _ => Ok(()),
    }
}

/// Elements flatten as the declared element type. An untyped declaration
/// falls back to the container's own tag.
fn flatten_element_type<'a>(
    declared: &'a DeclaredType,
    tag: &'a DeclaredType,
) -> &'a DeclaredType {
    match declared.element_type() {
        Some(element) if !element.is_any() => element,
        _ => tag,
    }
}

/// Typed lists of every element type. Registered exactly on
/// `TypeKey::TypedList`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypedListConverter;

impl Converter for TypedListConverter {
    fn check_type(&self, declared: &DeclaredType, value: &Object) -> Result<(), Error> {
        if declared.collection_kind() != Some(CollectionKind::List) {
            return Err(Error::mismatch(declared, value));
        }
        match value {
            Object::Null | Object::Seq(_) => Ok(()),
            Object::List(list) => check_element_tag(declared, list.element_type(), value),
            other => Err(Error::mismatch(declared, other)),
        }
    }

    fn to_flat(
        &self,
        engine: &Engine<'_>,
        declared: &DeclaredType,
        value: &Object,
    ) -> Result<Value, Error> {
        let (tag, items) = match (value, declared.element_type()) {
            (Object::Null, _) => return Ok(Value::Null),
            (Object::List(list), _) => (list.element_type(), list.items()),
            (Object::Seq(items), Some(element)) => (element, items.as_slice()),
            (other, _) => return Err(Error::mismatch(declared, other)),
        };
        let element = flatten_element_type(declared, tag);

        items
            .iter()
            .map(|item| engine.flatten(element, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    fn to_obj(
        &self,
        engine: &Engine<'_>,
        declared: &DeclaredType,
        value: &Value,
    ) -> Result<Object, Error> {
        let element = declared
            .element_type()
            .ok_or_else(|| Error::mismatch_value(declared, value))?;
        let items = match value {
            Value::Null => return Ok(Object::Null),
            Value::Array(items) => items,
            other => return Err(Error::mismatch_value(declared, other)),
        };

        let mut list = TypedList::new(element.clone());
        for item in items {
            list.push(engine.unflatten(element, item)?);
        }
        Ok(Object::List(list))
    }
}

/// Typed maps of every element type. Registered exactly on
/// `TypeKey::TypedMap`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypedMapConverter;

impl Converter for TypedMapConverter {
    fn check_type(&self, declared: &DeclaredType, value: &Object) -> Result<(), Error> {
        if declared.collection_kind() != Some(CollectionKind::Map) {
            return Err(Error::mismatch(declared, value));
        }
        match value {
            Object::Null | Object::Dict(_) => Ok(()),
            Object::Map(map) => check_element_tag(declared, map.element_type(), value),
            other => Err(Error::mismatch(declared, other)),
        }
    }

    fn to_flat(
        &self,
        engine: &Engine<'_>,
        declared: &DeclaredType,
        value: &Object,
    ) -> Result<Value, Error> {
        let (tag, entries) = match (value, declared.element_type()) {
            (Object::Null, _) => return Ok(Value::Null),
            (Object::Map(map), _) => (map.element_type(), map.iter()),
            (Object::Dict(entries), Some(element)) => (element, entries.iter()),
            (other, _) => return Err(Error::mismatch(declared, other)),
        };

        let element = flatten_element_type(declared, tag);

        let mut flat = BTreeMap::new();
        for (key, item) in entries {
            flat.insert(key.clone(), engine.flatten(element, item)?);
        }
        Ok(Value::Map(flat))
    }

    fn to_obj(
        &self,
        engine: &Engine<'_>,
        declared: &DeclaredType,
        value: &Value,
    ) -> Result<Object, Error> {
        let element = declared
            .element_type()
            .ok_or_else(|| Error::mismatch_value(declared, value))?;
        let entries = match value {
            Value::Null => return Ok(Object::Null),
            Value::Map(entries) => entries,
            other => return Err(Error::mismatch_value(declared, other)),
        };

        let mut map = TypedMap::new(element.clone());
        for (key, item) in entries {
            map.insert(key.clone(), engine.unflatten(element, item)?);
        }
        Ok(Object::Map(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ConvertManager;
    use crate::schema::SchemaType;

    fn with_engine<R>(f: impl FnOnce(&Engine<'_>) -> R) -> R {
        let registry = ConvertManager::new();
        f(&Engine::new(&registry))
    }

    #[test]
    fn date_format() {
        with_engine(|engine| {
            let date = NaiveDate::from_ymd_opt(2011, 3, 9).unwrap();
            let flat = DateConverter
                .to_flat(engine, &DeclaredType::Date, &Object::Date(date))
                .unwrap();
            assert_eq!(flat, Value::from("2011-03-09"));

            let restored = DateConverter
                .to_obj(engine, &DeclaredType::Date, &flat)
                .unwrap();
            assert_eq!(restored, Object::Date(date));
        });
    }

    #[test]
    fn datetime_always_has_six_fraction_digits() {
        with_engine(|engine| {
            let whole = NaiveDate::from_ymd_opt(2011, 3, 9)
                .unwrap()
                .and_hms_opt(14, 5, 0)
                .unwrap();
            let flat = DateTimeConverter
                .to_flat(engine, &DeclaredType::DateTime, &Object::DateTime(whole))
                .unwrap();
            assert_eq!(flat, Value::from("2011-03-09T14:05:00.000000"));

            let precise = NaiveDate::from_ymd_opt(2011, 3, 9)
                .unwrap()
                .and_hms_micro_opt(14, 5, 0, 123456)
                .unwrap();
            let flat = DateTimeConverter
                .to_flat(engine, &DeclaredType::DateTime, &Object::DateTime(precise))
                .unwrap();
            assert_eq!(flat, Value::from("2011-03-09T14:05:00.123456"));
            assert_eq!(
                DateTimeConverter
                    .to_obj(engine, &DeclaredType::DateTime, &flat)
                    .unwrap(),
                Object::DateTime(precise)
            );
        });
    }

    #[test]
    fn time_roundtrip() {
        with_engine(|engine| {
            let time = NaiveTime::from_hms_micro_opt(23, 59, 1, 42).unwrap();
            let flat = TimeConverter
                .to_flat(engine, &DeclaredType::Time, &Object::Time(time))
                .unwrap();
            assert_eq!(flat, Value::from("23:59:01.000042"));
            assert_eq!(
                TimeConverter.to_obj(engine, &DeclaredType::Time, &flat).unwrap(),
                Object::Time(time)
            );
        });
    }

    #[test]
    fn malformed_temporal_input_is_a_format_error() {
        with_engine(|engine| {
            let cases: [(&dyn Converter, DeclaredType, Value); 5] = [
                (&DateConverter, DeclaredType::Date, Value::from("09.03.2011")),
                (&DateConverter, DeclaredType::Date, Value::from(20110309)),
                (&DateTimeConverter, DeclaredType::DateTime, Value::from("2011-03-09T14:05:00")),
                (&TimeConverter, DeclaredType::Time, Value::from("14:05:00.12")),
                (&TimeConverter, DeclaredType::Time, Value::from("25:00:00.000000")),
            ];
            for (converter, declared, input) in cases {
                let err = converter.to_obj(engine, &declared, &input).unwrap_err();
                assert!(matches!(err, Error::Format { .. }), "{} -> {:?}", input, err);
            }
        });
    }

    #[test]
    fn temporal_null_passes_through() {
        with_engine(|engine| {
            assert_eq!(
                DateConverter.to_flat(engine, &DeclaredType::Date, &Object::Null).unwrap(),
                Value::Null
            );
            assert_eq!(
                TimeConverter.to_obj(engine, &DeclaredType::Time, &Value::Null).unwrap(),
                Object::Null
            );
        });
    }

    #[test]
    fn record_to_obj_keeps_defaults_for_missing_keys() {
        let schema = SchemaType::builder("Country")
            .field("desc", DeclaredType::Str)
            .default("pop", 7)
            .build();

        with_engine(|engine| {
            let flat: Value = [("desc", Value::from("alpine"))].into_iter().collect();
            let restored = RecordConverter
                .to_obj(engine, &schema.declared_type(), &flat)
                .unwrap();
            let record = restored.as_record().unwrap();
            assert_eq!(record.get("desc"), Some(&Object::from("alpine")));
            assert_eq!(record.get("pop"), Some(&Object::Int(7)));
        });
    }

    #[test]
    fn record_check_rejects_other_schemas() {
        let a = SchemaType::builder("A").build();
        let b = SchemaType::builder("B").build();

        let err = RecordConverter
            .check_type(&a.declared_type(), &Object::Record(b.new_instance()))
            .unwrap_err();
        assert_eq!(
            err,
            Error::TypeMismatch {
                expected: "A".to_string(),
                found: "B".to_string(),
            }
        );
        assert!(RecordConverter
            .check_type(&a.declared_type(), &Object::Null)
            .is_ok());
    }

    #[test]
    fn list_tag_must_conform_to_declared_element() {
        let declared = TypedList::of_type(DeclaredType::Str);
        let ints = Object::List(TypedList::from_items(DeclaredType::Int, [1]));
        assert!(TypedListConverter.check_type(&declared, &ints).is_err());

        let untyped = TypedList::of_type(DeclaredType::Any);
        assert!(TypedListConverter.check_type(&untyped, &ints).is_ok());
        assert!(TypedListConverter
            .check_type(&declared, &Object::from(vec!["a"]))
            .is_ok());
        assert!(TypedListConverter
            .check_type(&TypedMap::of_type(DeclaredType::Str), &ints)
            .is_err());
    }

    #[test]
    fn map_to_flat_checks_each_value() {
        with_engine(|engine| {
            let declared = TypedMap::of_type(DeclaredType::Int);
            let good = Object::Map(TypedMap::from_entries(
                DeclaredType::Int,
                [("a", Object::Int(1)), ("b", Object::Null)],
            ));
            let flat = TypedMapConverter.to_flat(engine, &declared, &good).unwrap();
            assert_eq!(
                flat,
                [("a", Value::Integer(1)), ("b", Value::Null)].into_iter().collect()
            );

            let bad = Object::Map(TypedMap::from_entries(
                DeclaredType::Int,
                [("a", Object::from("one"))],
            ));
            let err = TypedMapConverter.to_flat(engine, &declared, &bad).unwrap_err();
            assert!(err.is_type_mismatch());
        });
    }

    #[test]
    fn capabilities_completeness() {
        assert!(Capabilities::FULL.is_complete());
        assert!(!Capabilities::FLATTEN_ONLY.is_complete());
        assert!(!Capabilities::RESTORE_ONLY.is_complete());
        assert_eq!(RecordConverter.capabilities(), Capabilities::FULL);
    }
}
