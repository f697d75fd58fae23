//! End-to-end exercises of the decode pipeline's ordered dispatch and the
//! class-tag polymorphism boundary, against the scenarios the pipeline is
//! specified to handle.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use dialog_store::{
    CodecContext, CodecRegistry, Decode, DecodeInput, DialogStoreError, Document, DynValue, EncodeOutput,
    EnumCodec, PolymorphicCodec, ValueCodec,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Shape {
    Circle,
    Square,
}

impl EnumCodec for Shape {
    fn class_name() -> &'static str {
        "pkg.Shape"
    }

    fn resolve(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "circle" => Some(Shape::Circle),
            "square" => Some(Shape::Square),
            _ => None,
        }
    }
}

#[test]
fn it_resolves_a_tagged_polymorphic_enumeration() {
    let registry = CodecRegistry::new();
    let mut ctx = CodecContext::new(&registry);

    let value = Shape::decode(
        &mut ctx,
        &Document::String("pkg.Shape:Circle".to_string()),
        &Shape::type_hint(),
    )
    .unwrap();

    assert_eq!(value, Shape::Circle);
}

#[test]
fn it_resolves_a_bare_enumeration_constant_case_insensitively() {
    let registry = CodecRegistry::new();
    let mut ctx = CodecContext::new(&registry);

    let value = Shape::decode(&mut ctx, &Document::String("SQUARE".to_string()), &Shape::type_hint()).unwrap();

    assert_eq!(value, Shape::Square);
}

#[test]
fn it_fails_with_enum_resolution_on_an_unknown_constant() {
    let registry = CodecRegistry::new();
    let mut ctx = CodecContext::new(&registry);

    let err = Shape::decode(&mut ctx, &Document::String("Triangle".to_string()), &Shape::type_hint()).unwrap_err();

    assert!(matches!(err, DialogStoreError::EnumResolution { .. }));
}

#[test]
fn it_decodes_a_map_with_integer_keys_from_a_list_of_pairs() {
    let registry = CodecRegistry::new();
    let mut ctx = CodecContext::new(&registry);

    let input = Document::List(vec![
        Document::List(vec![Document::String("1".into()), Document::Int(10)]),
        Document::List(vec![Document::String("2".into()), Document::Int(20)]),
    ]);

    let map: HashMap<i64, i64> = HashMap::decode(&mut ctx, &input, &HashMap::<i64, i64>::type_hint()).unwrap();

    assert_eq!(map.get(&1), Some(&10));
    assert_eq!(map.get(&2), Some(&20));
}

#[test]
fn it_decodes_a_null_list_field_as_empty_never_null() {
    let registry = CodecRegistry::new();
    let mut ctx = CodecContext::new(&registry);

    let list: Vec<String> = Vec::decode(&mut ctx, &Document::Null, &Vec::<String>::type_hint()).unwrap();

    assert!(list.is_empty());
}

#[test]
fn it_decodes_each_array_element_individually_not_the_whole_list() {
    let registry = CodecRegistry::new();
    let mut ctx = CodecContext::new(&registry);

    let input = Document::List(vec![Document::Int(1), Document::Int(2), Document::Int(3)]);
    let array: [i64; 3] = <[i64; 3]>::decode(&mut ctx, &input, &<[i64; 3]>::type_hint()).unwrap();

    assert_eq!(array, [1, 2, 3]);
}

#[derive(Clone, Debug, PartialEq)]
struct Circle {
    radius: f64,
}

struct CircleCodec;

impl ValueCodec<Circle> for CircleCodec {
    fn construct(&self, _ctx: &mut CodecContext, _input: &DecodeInput) -> Result<Circle, DialogStoreError> {
        Ok(Circle { radius: 0.0 })
    }

    fn decode(
        &self,
        _ctx: &mut CodecContext,
        value: &mut Circle,
        input: &DecodeInput,
    ) -> Result<(), DialogStoreError> {
        value.radius = input.field_f64("radius").unwrap_or(0.0);
        Ok(())
    }

    fn encode(
        &self,
        _ctx: &mut CodecContext,
        value: &Circle,
        output: &mut EncodeOutput,
    ) -> Result<(), DialogStoreError> {
        output.write("radius", Document::Float(value.radius));
        Ok(())
    }
}

#[test]
fn it_resolves_a_class_tag_to_a_registered_codec() {
    let mut registry = CodecRegistry::new();
    registry.register(Arc::new(PolymorphicCodec::new("pkg.Circle", CircleCodec)));
    let mut ctx = CodecContext::new(&registry);

    let mut fields = IndexMap::new();
    fields.insert("__class".to_string(), Document::String("pkg.Circle".to_string()));
    fields.insert("radius".to_string(), Document::Float(2.5));
    let document = Document::Map(fields);

    let value: Box<dyn DynValue> = Decode::decode(&mut ctx, &document, &dialog_store::TypeHint::Any).unwrap();
    let circle = value.downcast_ref::<Circle>().unwrap();

    assert_eq!(circle, &Circle { radius: 2.5 });
}

#[test]
fn it_falls_back_to_the_static_type_on_an_unresolved_class_tag() {
    let mut registry = CodecRegistry::new();
    registry.register(Arc::new(PolymorphicCodec::new("pkg.Circle", CircleCodec)));
    let mut ctx = CodecContext::new(&registry);

    let mut shape_fields = IndexMap::new();
    shape_fields.insert("__class".to_string(), Document::String("pkg.UnknownShape".to_string()));
    shape_fields.insert("radius".to_string(), Document::Float(9.0));

    let mut outer_fields = IndexMap::new();
    outer_fields.insert("shape".to_string(), Document::Map(shape_fields));
    let outer = Document::Map(outer_fields);

    let input = DecodeInput::new(&outer);
    let value: Box<dyn DynValue> = input.read_polymorphic(&mut ctx, "shape", "pkg.Circle").unwrap();
    let circle = value.downcast_ref::<Circle>().unwrap();

    assert_eq!(circle, &Circle { radius: 9.0 });
}

#[test]
fn it_reads_the_primary_key_from_an_overridden_field_name() {
    let mut fields = IndexMap::new();
    fields.insert("alt_id".to_string(), Document::Int(42));
    let document = Document::Map(fields);

    let key: i64 = DecodeInput::new(&document)
        .with_key_field_override("alt_id")
        .read_key("id")
        .unwrap();

    assert_eq!(key, 42);

    // Without the override, reading "id" against the same document fails:
    // the field genuinely lives under "alt_id".
    let err = DecodeInput::new(&document).read_key::<i64>("id").unwrap_err();
    assert!(matches!(err, DialogStoreError::MissingPrimaryKey("id")));
}
