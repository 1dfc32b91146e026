//! End-to-end flatten/unflatten behaviour over the process-wide registry.

use chrono::{NaiveDate, NaiveTime};
use flatrec_core::{
    flatten, register, unflatten, Converter, CustomType, DeclaredType, Engine, Error, MatchMode,
    Object, SchemaRef, SchemaType, TypedList, TypedMap, Value,
};

fn name_schema() -> SchemaRef {
    SchemaType::builder("Name")
        .field("first_name", DeclaredType::Any)
        .field("last_name", DeclaredType::Any)
        .build()
}

fn name(schema: &SchemaRef, first: &str, last: &str) -> Object {
    schema
        .instantiate([("first_name", first), ("last_name", last)])
        .unwrap()
        .into()
}

fn country_schema() -> SchemaRef {
    SchemaType::builder("Country")
        .field("desc", DeclaredType::Str)
        .default("pop", 7)
        .default("num_rivers", 231)
        .build()
}

#[test]
fn deep_nesting_has_the_expected_flat_shape() {
    let region = SchemaType::builder("Region")
        .field("name", DeclaredType::Str)
        .build();
    let country = SchemaType::builder("Country")
        .field("size", DeclaredType::Int)
        .field("regions", TypedList::of_type(region.declared_type()))
        .build();
    let world = SchemaType::builder("World")
        .field("countries", TypedMap::of_type(country.declared_type()))
        .build();

    let regions = TypedList::from_items(
        region.declared_type(),
        [
            region.instantiate([("name", "styria")]).unwrap(),
            region.instantiate([("name", "carinthia")]).unwrap(),
        ],
    );
    let austria = country
        .instantiate([("size", Object::from(7)), ("regions", Object::from(regions))])
        .unwrap();
    let countries = TypedMap::from_entries(country.declared_type(), [("austria", austria)]);
    let earth = world.instantiate([("countries", countries)]).unwrap();

    let flat = earth.flatten().unwrap();
    let expected: Value = [(
        "countries",
        [(
            "austria",
            [
                ("size", Value::from(7)),
                (
                    "regions",
                    Value::from(vec![
                        [("name", "styria")].into_iter().collect::<Value>(),
                        [("name", "carinthia")].into_iter().collect::<Value>(),
                    ]),
                ),
            ]
            .into_iter()
            .collect::<Value>(),
        )]
        .into_iter()
        .collect::<Value>(),
    )]
    .into_iter()
    .collect();
    assert_eq!(flat, expected);
    assert!(flat.is_plain());

    let restored = world.unflatten(&flat).unwrap();
    assert_eq!(restored, earth);
    assert_eq!(restored.flatten().unwrap(), flat);

    let restored_countries = restored.get("countries").and_then(Object::as_map).unwrap();
    assert_eq!(restored_countries.element_type(), &country.declared_type());
}

#[test]
fn typed_list_of_records_roundtrips() {
    let name_schema = name_schema();
    let foo = SchemaType::builder("Foo")
        .field("a", DeclaredType::Any)
        .field("b", TypedList::of_type(name_schema.declared_type()))
        .build();

    let record = foo
        .instantiate([
            ("a", Object::from("hallo")),
            (
                "b",
                Object::from(vec![
                    name(&name_schema, "hans", "conrad"),
                    name(&name_schema, "karl", "hirsch"),
                ]),
            ),
        ])
        .unwrap();

    let flat = record.flatten().unwrap();
    assert!(flat.is_plain());

    let restored = foo.unflatten(&flat).unwrap();
    let list = restored.get("b").and_then(Object::as_list).unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list.element_type(), &name_schema.declared_type());
    for item in list {
        assert!(item.as_record().unwrap().is_instance_of(&name_schema));
    }
    assert_eq!(
        list.get(1)
            .and_then(Object::as_record)
            .and_then(|r| r.get("last_name")),
        Some(&Object::from("hirsch"))
    );
    assert_eq!(restored.flatten().unwrap(), flat);
}

#[test]
fn foreign_element_in_typed_list_is_rejected() {
    let name_schema = name_schema();
    let foo = SchemaType::builder("Foo")
        .field("a", DeclaredType::Any)
        .field("b", TypedList::of_type(name_schema.declared_type()))
        .build();

    let record = foo
        .instantiate([
            ("a", Object::from("hallo")),
            (
                "b",
                Object::from(vec![name(&name_schema, "hans", "conrad"), Object::from("foobar")]),
            ),
        ])
        .unwrap();

    let err = record.flatten().unwrap_err();
    assert!(err.is_type_mismatch(), "{}", err);
}

#[test]
fn foreign_value_in_typed_map_is_rejected() {
    let name_schema = name_schema();
    let foo = SchemaType::builder("Foo")
        .field("b", TypedMap::of_type(name_schema.declared_type()))
        .build();

    let entries: Object = [
        ("first", name(&name_schema, "hans", "conrad")),
        ("second", Object::from("foobar")),
    ]
    .into_iter()
    .collect();
    let record = foo.instantiate([("b", entries)]).unwrap();

    assert!(record.flatten().unwrap_err().is_type_mismatch());
}

#[test]
fn typed_lists_with_different_elements_stay_isolated() {
    let x = SchemaType::builder("X").field("x", DeclaredType::Int).build();
    let y = SchemaType::builder("Y").field("y", DeclaredType::Int).build();
    let top = SchemaType::builder("Top")
        .field("t1", TypedList::of_type(x.declared_type()))
        .field("t2", TypedList::of_type(y.declared_type()))
        .build();

    let a = x.instantiate([("x", 1)]).unwrap();
    let b = y.instantiate([("y", 2)]).unwrap();
    let t = top
        .instantiate([("t1", vec![a]), ("t2", vec![b])])
        .unwrap();

    let flat = t.flatten().unwrap();
    let t1 = flat.get("t1").and_then(Value::as_array).unwrap();
    assert_eq!(t1[0].get("x"), Some(&Value::Integer(1)));
    let t2 = flat.get("t2").and_then(Value::as_array).unwrap();
    assert_eq!(t2[0].get("y"), Some(&Value::Integer(2)));

    assert_eq!(top.field_type("t1").and_then(DeclaredType::element_type), Some(&x.declared_type()));
    assert_eq!(top.field_type("t2").and_then(DeclaredType::element_type), Some(&y.declared_type()));
}

#[test]
fn nested_records_roundtrip() {
    let bar = SchemaType::builder("Bar")
        .field("first_name", DeclaredType::Any)
        .field("last_name", DeclaredType::Any)
        .build();
    let foo = SchemaType::builder("Foo")
        .field("a", DeclaredType::Any)
        .field("b", bar.declared_type())
        .build();

    let inner = bar
        .instantiate([("first_name", "Chris"), ("last_name", "Young")])
        .unwrap();
    let outer = foo
        .instantiate([("a", Object::from(5)), ("b", Object::from(inner))])
        .unwrap();

    let restored = foo.unflatten(&outer.flatten().unwrap()).unwrap();
    assert_eq!(restored.get("a"), Some(&Object::Int(5)));
    let restored_bar = restored.get("b").and_then(Object::as_record).unwrap();
    assert!(restored_bar.is_instance_of(&bar));
    assert_eq!(restored_bar.get("first_name"), Some(&Object::from("Chris")));
    assert_eq!(restored, outer);
}

#[test]
fn defaults_survive_a_roundtrip() {
    let country = country_schema();
    let world = SchemaType::builder("World")
        .field("countries", TypedMap::of_type(country.declared_type()))
        .build();

    let austria: Object = [("austria", country.new_instance())].into_iter().collect();
    let earth = world.instantiate([("countries", austria)]).unwrap();

    let flat = earth.flatten().unwrap();
    let restored = world.unflatten(&flat).unwrap();
    let austria = restored
        .get("countries")
        .and_then(Object::as_map)
        .and_then(|m| m.get("austria"))
        .and_then(Object::as_record)
        .unwrap();
    assert_eq!(austria.get("pop"), Some(&Object::Int(7)));
    assert_eq!(austria.get("num_rivers"), Some(&Object::Int(231)));
    assert_eq!(restored.flatten().unwrap(), flat);
}

#[test]
fn flatten_enforces_declared_types() {
    let country = country_schema();
    let record = country.instantiate([("desc", 42)]).unwrap();

    let err = record.flatten().unwrap_err();
    assert_eq!(
        err,
        Error::TypeMismatch {
            expected: "str".to_string(),
            found: "int".to_string(),
        }
    );
}

#[test]
fn unflatten_enforces_declared_types() {
    let country = country_schema();
    let flat: Value = [("desc", 42)].into_iter().collect();

    assert!(country.unflatten(&flat).unwrap_err().is_type_mismatch());
}

#[test]
fn unset_fields_flatten_to_null_and_missing_keys_keep_defaults() {
    let country = country_schema();
    let flat = country.new_instance().flatten().unwrap();
    assert_eq!(flat.get("desc"), Some(&Value::Null));
    assert_eq!(flat.get("pop"), Some(&Value::Integer(7)));

    let restored = country.unflatten(&Value::map()).unwrap();
    assert_eq!(restored, country.new_instance());

    let with_extra: Value = [("pop", Value::from(3)), ("capital", Value::from("Vienna"))]
        .into_iter()
        .collect();
    let restored = country.unflatten(&with_extra).unwrap();
    assert_eq!(restored.get("pop"), Some(&Object::Int(3)));
}

#[test]
fn unflatten_requires_a_map_for_records() {
    let country = country_schema();
    let err = country.unflatten(&Value::from(vec![1, 2])).unwrap_err();
    assert!(err.is_type_mismatch());
}

#[derive(Debug, PartialEq)]
struct Rgb {
    r: u8,
    g: u8,
    b: u8,
}

struct RgbConverter;

impl Converter for RgbConverter {
    fn to_flat(
        &self,
        _: &Engine<'_>,
        declared: &DeclaredType,
        value: &Object,
    ) -> Result<Value, Error> {
        let rgb = value
            .as_custom::<Rgb>()
            .ok_or_else(|| Error::mismatch(declared, value))?;
        Ok(Value::String(format!("{},{},{}", rgb.r, rgb.g, rgb.b)))
    }

    fn to_obj(
        &self,
        _: &Engine<'_>,
        declared: &DeclaredType,
        value: &Value,
    ) -> Result<Object, Error> {
        let DeclaredType::Custom(ty) = declared else {
            return Err(Error::mismatch_value(declared, value));
        };
        let parts = value
            .as_str()
            .map(|s| s.split(',').map(str::parse::<u8>).collect::<Result<Vec<_>, _>>());
        match parts {
            Some(Ok(parts)) if parts.len() == 3 => Ok(Object::custom(
                ty,
                Rgb {
                    r: parts[0],
                    g: parts[1],
                    b: parts[2],
                },
            )),
            _ => Err(Error::format("rgb", value)),
        }
    }
}

#[test]
fn custom_converter_roundtrip() {
    let rgb = CustomType::new("Rgb");
    register(rgb.key(), RgbConverter, MatchMode::Exact).unwrap();

    let foo = SchemaType::builder("Foo")
        .field("color", rgb.declared_type())
        .build();
    let color = Object::custom(
        &rgb,
        Rgb {
            r: 255,
            g: 124,
            b: 45,
        },
    );
    let record = foo.instantiate([("color", color.clone())]).unwrap();

    let flat = record.flatten().unwrap();
    assert!(flat.is_plain());
    assert_eq!(flat.get("color"), Some(&Value::from("255,124,45")));

    let restored = foo.unflatten(&flat).unwrap();
    assert_eq!(restored.get("color"), Some(&color));
}

#[test]
fn inexact_converter_covers_subtypes() {
    let color = CustomType::new("Color");
    let rgb = CustomType::extending("Rgb", &color);
    register(color.key(), RgbConverter, MatchMode::Inexact).unwrap();

    let value = Object::custom(&rgb, Rgb { r: 1, g: 2, b: 3 });
    let flat = flatten(&value).unwrap();
    assert_eq!(flat, Value::from("1,2,3"));
    assert_eq!(unflatten(&rgb.declared_type(), &flat).unwrap(), value);
}

#[test]
fn temporal_fields_roundtrip() {
    let event = SchemaType::builder("Event")
        .field("day", DeclaredType::Date)
        .field("at", DeclaredType::DateTime)
        .field("alarm", DeclaredType::Time)
        .build();

    let day = NaiveDate::from_ymd_opt(2010, 11, 2).unwrap();
    let at = day.and_hms_micro_opt(8, 30, 15, 250_000).unwrap();
    let alarm = NaiveTime::from_hms_opt(6, 0, 0).unwrap();
    let record = event
        .instantiate([
            ("day", Object::from(day)),
            ("at", Object::from(at)),
            ("alarm", Object::from(alarm)),
        ])
        .unwrap();

    let flat = record.flatten().unwrap();
    assert_eq!(flat.get("day"), Some(&Value::from("2010-11-02")));
    assert_eq!(flat.get("at"), Some(&Value::from("2010-11-02T08:30:15.250000")));
    assert_eq!(flat.get("alarm"), Some(&Value::from("06:00:00.000000")));
    assert_eq!(event.unflatten(&flat).unwrap(), record);

    let bad: Value = [("day", "2 Nov 2010")].into_iter().collect();
    assert!(matches!(event.unflatten(&bad), Err(Error::Format { .. })));
}

#[test]
fn primitives_flatten_to_themselves() {
    assert_eq!(flatten(&Object::from("Hello World")).unwrap(), Value::from("Hello World"));
    assert_eq!(flatten(&Object::from(3.5)).unwrap(), Value::Float(3.5));
    assert_eq!(flatten(&Object::Null).unwrap(), Value::Null);
    assert_eq!(
        unflatten(&DeclaredType::Any, &Value::from("Hello World")).unwrap(),
        Object::from("Hello World")
    );
}

#[test]
fn any_fields_hold_records() {
    let inner = SchemaType::builder("Inner")
        .field("v", DeclaredType::Int)
        .build();
    let outer = SchemaType::builder("Outer")
        .field("anything", DeclaredType::Any)
        .build();

    let record = outer
        .instantiate([("anything", inner.instantiate([("v", 1)]).unwrap())])
        .unwrap();
    let flat = record.flatten().unwrap();
    assert_eq!(
        flat.get("anything").and_then(|v| v.get("v")),
        Some(&Value::Integer(1))
    );

    // Without a declared schema the map comes back as a plain dict.
    let restored = outer.unflatten(&flat).unwrap();
    let expected: Object = [("v", 1)].into_iter().collect();
    assert_eq!(restored.get("anything"), Some(&expected));
}

#[test]
fn subtype_records_flatten_as_their_declared_schema() {
    let base = SchemaType::builder("Base")
        .field("id", DeclaredType::Str)
        .build();
    let derived = SchemaType::builder("Derived")
        .extends(&base)
        .field("extra", DeclaredType::Int)
        .build();
    let holder = SchemaType::builder("Holder")
        .field("item", base.declared_type())
        .build();

    let item = derived
        .instantiate([("id", Object::from("x")), ("extra", Object::from(1))])
        .unwrap();
    let flat = holder.instantiate([("item", item)]).unwrap().flatten().unwrap();

    let expected: Value = [("id", "x")].into_iter().collect();
    assert_eq!(flat.get("item"), Some(&expected));
}

#[test]
fn subtype_tagged_collections_flatten_as_their_declared_element() {
    let base = SchemaType::builder("Base")
        .field("id", DeclaredType::Str)
        .build();
    let derived = SchemaType::builder("Derived")
        .extends(&base)
        .field("extra", DeclaredType::Int)
        .build();
    let holder = SchemaType::builder("Holder")
        .field("items", TypedList::of_type(base.declared_type()))
        .field("by_key", TypedMap::of_type(base.declared_type()))
        .build();

    let item = derived
        .instantiate([("id", Object::from("x")), ("extra", Object::from(1))])
        .unwrap();
    let record = holder
        .instantiate([
            (
                "items",
                Object::List(TypedList::from_items(derived.declared_type(), [item.clone()])),
            ),
            (
                "by_key",
                Object::Map(TypedMap::from_entries(derived.declared_type(), [("k", item)])),
            ),
        ])
        .unwrap();

    let flat = record.flatten().unwrap();
    let expected: Value = [("id", "x")].into_iter().collect();
    assert_eq!(flat.get("items"), Some(&Value::Array(vec![expected.clone()])));
    assert_eq!(
        flat.get("by_key"),
        Some(&[("k", expected)].into_iter().collect::<Value>())
    );

    let restored = holder.unflatten(&flat).unwrap();
    assert_eq!(restored.flatten().unwrap(), flat);
}

#[test]
fn explicit_field_types_govern_their_defaults() {
    let schema = SchemaType::builder("Gauge")
        .field_with_default("level", DeclaredType::Float, 1.5)
        .field_with_default("count", DeclaredType::Float, 3)
        .build();

    // An integer default does not satisfy a float field when flattened.
    let err = schema.new_instance().flatten().unwrap_err();
    assert!(err.is_type_mismatch(), "{:?}", err);

    // Restoring widens the stored integer instead.
    let flat: Value = [("level", Value::from(2.5)), ("count", Value::from(3))]
        .into_iter()
        .collect();
    let gauge = schema.unflatten(&flat).unwrap();
    assert_eq!(gauge.get("count"), Some(&Object::Float(3.0)));
    assert_eq!(gauge.flatten().unwrap().get("count"), Some(&Value::Float(3.0)));
}
