//! `DecodeInput`/`EncodeOutput` (spec §4.1) and the type-directed decode
//! dispatch (spec §4.3, the hardest part of this crate) plus its mirror,
//! encode (spec §4.4).

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::codec::{CodecContext, ErasedCodec};
use crate::document::{Document, CLASS_TAG_FIELD};
use crate::error::DialogStoreError;
use crate::hint::{ScalarKind, TypeHint};
use crate::numeric::{document_to_bool, document_to_f64, document_to_i64, document_to_u64, MapKey};
use crate::value::DynValue;

/// Reads typed fields by name out of a [`Document`] (spec §4.1).
pub struct DecodeInput<'a> {
    document: &'a Document,
    key_field_override: Option<&'static str>,
}

impl<'a> DecodeInput<'a> {
    /// Wraps `document` for field-by-field reads.
    pub fn new(document: &'a Document) -> Self {
        Self {
            document,
            key_field_override: None,
        }
    }

    /// Reads the primary key from `key_field_override` instead of the
    /// codec's declared key field name (spec §4.1).
    pub fn with_key_field_override(mut self, field: &'static str) -> Self {
        self.key_field_override = Some(field);
        self
    }

    /// The raw document node backing this input.
    pub fn document(&self) -> &'a Document {
        self.document
    }

    /// Borrows the raw value of `field`, if present.
    pub fn field_value(&self, field: &str) -> Option<&'a Document> {
        self.document.field(field)
    }

    /// Convenience scalar-coercing readers, used by hand-written codecs that
    /// don't need the full [`Decode`] machinery for a single numeric field.
    pub fn field_i64(&self, field: &str) -> Option<i64> {
        self.field_value(field).and_then(document_to_i64)
    }

    /// See [`DecodeInput::field_i64`].
    pub fn field_f64(&self, field: &str) -> Option<f64> {
        self.field_value(field).and_then(document_to_f64)
    }

    /// See [`DecodeInput::field_i64`].
    pub fn field_bool(&self, field: &str) -> Option<bool> {
        self.field_value(field).and_then(document_to_bool)
    }

    /// See [`DecodeInput::field_i64`].
    pub fn field_str(&self, field: &str) -> Option<&'a str> {
        match self.field_value(field) {
            Some(Document::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Reads `field`, recursively decoding through the full dispatch in
    /// [`Decode::decode`], using `T`'s own static [`TypeHint`].
    ///
    /// For a polymorphic field (one decoded through `Box<dyn DynValue>`) this
    /// hint is always [`TypeHint::Any`], so a class-tag miss has no statically
    /// expected type to fall back to and fails with [`DialogStoreError::CodecMissing`].
    /// Use [`DecodeInput::read_polymorphic`] instead when the field's expected
    /// class is known.
    pub fn read<T: Decode>(&self, ctx: &mut CodecContext, field: &str) -> Result<T, DialogStoreError> {
        match self.field_value(field) {
            Some(value) => T::decode(ctx, value, &T::type_hint()),
            None => T::decode(ctx, &Document::Null, &T::type_hint()),
        }
    }

    /// Reads `field` as a polymorphic value, carrying `expected_class` as the
    /// statically expected type (spec §4.3 "Class-tag miss"): if the field's
    /// `__class` tag is absent or does not resolve to a registered codec,
    /// decode falls back to `expected_class` instead of failing.
    pub fn read_polymorphic<T: Decode>(
        &self,
        ctx: &mut CodecContext,
        field: &str,
        expected_class: &'static str,
    ) -> Result<T, DialogStoreError> {
        let hint = TypeHint::Object(expected_class);
        match self.field_value(field) {
            Some(value) => T::decode(ctx, value, &hint),
            None => T::decode(ctx, &Document::Null, &hint),
        }
    }

    /// Extracts the primary-key field as a scalar (spec §4.1: "privileged",
    /// accepts scalars only, fails on nested structures).
    ///
    /// Used before a codec context is available — e.g. to read the key out
    /// of a raw query result prior to locating the target codec.
    pub fn read_key<K: MapKey>(&self, field: &'static str) -> Result<K, DialogStoreError> {
        let key_field = self.key_field_override.unwrap_or(field);
        let value = self
            .field_value(key_field)
            .ok_or(DialogStoreError::MissingPrimaryKey(field))?;
        let text = scalar_to_key_string(value)?;
        K::decode_key(&text)
    }
}

/// Writes typed fields by name into a document-in-progress (spec §4.1).
#[derive(Default)]
pub struct EncodeOutput {
    fields: IndexMap<String, Document>,
}

impl EncodeOutput {
    /// Starts an empty output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `value` under `field`.
    pub fn write(&mut self, field: &str, value: impl Into<Document>) {
        self.fields.insert(field.to_owned(), value.into());
    }

    /// Writes an already-built [`Document`] under `field`.
    pub fn write_document(&mut self, field: &str, value: Document) {
        self.fields.insert(field.to_owned(), value);
    }

    /// Tags this output's node with a `__class` field, marking it as a
    /// polymorphic value whose concrete class differs from (or is otherwise
    /// not inferable from) the statically declared field type.
    pub fn set_class_tag(&mut self, class: &str) {
        self.fields
            .insert(CLASS_TAG_FIELD.to_owned(), Document::String(class.to_owned()));
    }

    /// Finishes this output, producing the map node it built.
    pub fn finish(self) -> Document {
        Document::Map(self.fields)
    }
}

/// Converts a scalar document value into the canonical string form used for
/// both primary keys (spec §4.1) and non-string map keys (spec §4.3 "String
/// -> key conversion", §6).
fn scalar_to_key_string(value: &Document) -> Result<String, DialogStoreError> {
    match value {
        Document::String(s) => Ok(s.clone()),
        Document::Int(n) => Ok(n.to_string()),
        Document::UInt(n) => Ok(n.to_string()),
        Document::Float(f) => Ok(crate::numeric::float_bits_as_i64(*f).to_string()),
        Document::Bool(b) => Ok((*b as i64).to_string()),
        Document::Null | Document::List(_) | Document::Map(_) => {
            Err(DialogStoreError::NonPrimitiveKey(format!("{value:?}")))
        }
    }
}

/// Type-directed decode from a [`Document`] into `Self` (spec §4.3).
///
/// Most implementations come from this module's blanket coverage of
/// primitives and containers; [`crate::value::DynValue`] targets go through
/// the dynamic class-tag dispatch, and enumerations go through
/// [`EnumCodec`].
pub trait Decode: Sized {
    /// The type descriptor this implementation corresponds to. Used at the
    /// dynamic dispatch boundary when a container's element type needs to
    /// be communicated to the registry (e.g. a class-tag fallback).
    fn type_hint() -> TypeHint {
        TypeHint::Any
    }

    /// Decodes `input`, which was produced as a document value for a field
    /// declared with this type.
    fn decode(ctx: &mut CodecContext, input: &Document, hint: &TypeHint) -> Result<Self, DialogStoreError>;
}

impl Decode for Document {
    fn decode(_ctx: &mut CodecContext, input: &Document, _hint: &TypeHint) -> Result<Self, DialogStoreError> {
        Ok(input.clone())
    }
}

macro_rules! decode_signed {
    ($ty:ty) => {
        impl Decode for $ty {
            fn type_hint() -> TypeHint {
                TypeHint::Scalar(ScalarKind::SignedInt)
            }

            fn decode(_ctx: &mut CodecContext, input: &Document, _hint: &TypeHint) -> Result<Self, DialogStoreError> {
                match input {
                    Document::Null => Ok(0 as $ty),
                    _ => document_to_i64(input)
                        .map(|n| n as $ty)
                        .ok_or_else(|| DialogStoreError::DecodeFailed(format!("expected a number, found {input:?}"))),
                }
            }
        }
    };
}

macro_rules! decode_unsigned {
    ($ty:ty) => {
        impl Decode for $ty {
            fn type_hint() -> TypeHint {
                TypeHint::Scalar(ScalarKind::UnsignedInt)
            }

            fn decode(_ctx: &mut CodecContext, input: &Document, _hint: &TypeHint) -> Result<Self, DialogStoreError> {
                match input {
                    Document::Null => Ok(0 as $ty),
                    _ => document_to_u64(input)
                        .map(|n| n as $ty)
                        .ok_or_else(|| DialogStoreError::DecodeFailed(format!("expected a number, found {input:?}"))),
                }
            }
        }
    };
}

macro_rules! decode_float {
    ($ty:ty) => {
        impl Decode for $ty {
            fn type_hint() -> TypeHint {
                TypeHint::Scalar(ScalarKind::Float)
            }

            fn decode(_ctx: &mut CodecContext, input: &Document, _hint: &TypeHint) -> Result<Self, DialogStoreError> {
                match input {
                    Document::Null => Ok(0 as $ty),
                    _ => document_to_f64(input)
                        .map(|n| n as $ty)
                        .ok_or_else(|| DialogStoreError::DecodeFailed(format!("expected a number, found {input:?}"))),
                }
            }
        }
    };
}

decode_signed!(i8);
decode_signed!(i16);
decode_signed!(i32);
decode_signed!(i64);
decode_unsigned!(u8);
decode_unsigned!(u16);
decode_unsigned!(u32);
decode_unsigned!(u64);
decode_float!(f32);
decode_float!(f64);

impl Decode for bool {
    fn type_hint() -> TypeHint {
        TypeHint::Scalar(ScalarKind::Bool)
    }

    fn decode(_ctx: &mut CodecContext, input: &Document, _hint: &TypeHint) -> Result<Self, DialogStoreError> {
        match input {
            Document::Null => Ok(false),
            _ => document_to_bool(input)
                .ok_or_else(|| DialogStoreError::DecodeFailed(format!("expected a boolean, found {input:?}"))),
        }
    }
}

impl Decode for String {
    fn type_hint() -> TypeHint {
        TypeHint::Scalar(ScalarKind::String)
    }

    fn decode(_ctx: &mut CodecContext, input: &Document, _hint: &TypeHint) -> Result<Self, DialogStoreError> {
        match input {
            Document::Null => Ok(String::new()),
            Document::String(s) => Ok(s.clone()),
            _ => Err(DialogStoreError::DecodeFailed(format!(
                "expected a string, found {input:?}"
            ))),
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn type_hint() -> TypeHint {
        T::type_hint()
    }

    fn decode(ctx: &mut CodecContext, input: &Document, hint: &TypeHint) -> Result<Self, DialogStoreError> {
        match input {
            Document::Null => Ok(None),
            _ => T::decode(ctx, input, hint).map(Some),
        }
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn type_hint() -> TypeHint {
        TypeHint::List(Box::new(T::type_hint()))
    }

    fn decode(ctx: &mut CodecContext, input: &Document, _hint: &TypeHint) -> Result<Self, DialogStoreError> {
        match input {
            // A null list field decodes to an empty list, never null (spec
            // §8 scenario 4).
            Document::Null => Ok(Vec::new()),
            Document::List(items) => items
                .iter()
                .map(|item| T::decode(ctx, item, &T::type_hint()))
                .collect(),
            _ => Err(DialogStoreError::DecodeFailed(format!(
                "expected a list, found {input:?}"
            ))),
        }
    }
}

impl<T: Decode, const N: usize> Decode for [T; N] {
    fn type_hint() -> TypeHint {
        TypeHint::Array(Box::new(T::type_hint()), N)
    }

    fn decode(ctx: &mut CodecContext, input: &Document, _hint: &TypeHint) -> Result<Self, DialogStoreError> {
        let items: &[Document] = match input {
            Document::Null => &[],
            Document::List(items) => items,
            _ => {
                return Err(DialogStoreError::DecodeFailed(format!(
                    "expected an array, found {input:?}"
                )));
            }
        };
        if !items.is_empty() && items.len() != N {
            return Err(DialogStoreError::DecodeFailed(format!(
                "expected an array of length {N}, found {}",
                items.len()
            )));
        }
        // Each element is decoded individually -- NOT the whole list passed
        // through as every element's input (see design notes §9).
        let decoded: Vec<T> = if items.is_empty() {
            (0..N)
                .map(|_| T::decode(ctx, &Document::Null, &T::type_hint()))
                .collect::<Result<_, _>>()?
        } else {
            items
                .iter()
                .map(|item| T::decode(ctx, item, &T::type_hint()))
                .collect::<Result<_, _>>()?
        };
        decoded
            .try_into()
            .map_err(|_| DialogStoreError::DecodeFailed("array length mismatch after decode".into()))
    }
}

impl<K, V> Decode for HashMap<K, V>
where
    K: MapKey + Eq + Hash,
    V: Decode,
{
    fn type_hint() -> TypeHint {
        TypeHint::Map(Box::new(TypeHint::Any), Box::new(V::type_hint()))
    }

    fn decode(ctx: &mut CodecContext, input: &Document, _hint: &TypeHint) -> Result<Self, DialogStoreError> {
        match input {
            Document::Null => Ok(HashMap::new()),
            // Maps with non-string keys are serialized as [[k, v], ...]
            // (spec §6); lists are checked before the generic document
            // branch because of this flattening (spec §4.3 rule 2).
            Document::List(pairs) => {
                let mut map = HashMap::with_capacity(pairs.len());
                for pair in pairs {
                    let [key_doc, value_doc] = match pair.as_list() {
                        Some([key_doc, value_doc]) => [key_doc, value_doc],
                        _ => {
                            return Err(DialogStoreError::DecodeFailed(
                                "expected a [key, value] pair".into(),
                            ));
                        }
                    };
                    let key_text = scalar_to_key_string(key_doc)?;
                    let key = K::decode_key(&key_text)?;
                    let value = V::decode(ctx, value_doc, &V::type_hint())?;
                    map.insert(key, value);
                }
                Ok(map)
            }
            // Maps with string keys are serialized as document/map nodes
            // (spec §6, §4.3 rule 6).
            Document::Map(fields) => {
                let mut map = HashMap::with_capacity(fields.len());
                for (key_text, value_doc) in fields {
                    if key_text == CLASS_TAG_FIELD {
                        continue;
                    }
                    let key = K::decode_key(key_text)?;
                    let value = V::decode(ctx, value_doc, &V::type_hint())?;
                    map.insert(key, value);
                }
                Ok(map)
            }
            _ => Err(DialogStoreError::DecodeFailed(format!(
                "expected a map, found {input:?}"
            ))),
        }
    }
}

impl Decode for Box<dyn DynValue> {
    fn type_hint() -> TypeHint {
        TypeHint::Any
    }

    fn decode(ctx: &mut CodecContext, input: &Document, hint: &TypeHint) -> Result<Self, DialogStoreError> {
        let doc = match input {
            Document::Map(_) => input,
            _ => {
                return Err(DialogStoreError::DecodeFailed(format!(
                    "expected a polymorphic object, found {input:?}"
                )));
            }
        };

        let codec = match doc.class_tag() {
            Some(name) => match ctx.find_codec(name) {
                Some(codec) => codec,
                None => {
                    tracing::debug!(
                        class = name,
                        "class tag did not resolve to a registered codec, falling back to the statically expected type"
                    );
                    static_codec_from_hint(ctx, hint)?
                }
            },
            None => static_codec_from_hint(ctx, hint)?,
        };

        let nested = DecodeInput::new(doc);
        let mut value = codec.construct_erased(ctx, &nested)?;
        codec.decode_erased(ctx, value.as_mut(), &nested)?;
        Ok(value)
    }
}

fn static_codec_from_hint(
    ctx: &CodecContext,
    hint: &TypeHint,
) -> Result<Arc<dyn ErasedCodec>, DialogStoreError> {
    match hint {
        TypeHint::Object(class) => ctx
            .find_codec(class)
            .ok_or_else(|| DialogStoreError::CodecMissing((*class).to_string())),
        _ => Err(DialogStoreError::CodecMissing(
            "no statically expected class for this polymorphic field".to_string(),
        )),
    }
}

/// A registered enumeration, decoded from a bare `"CONST"` string or a
/// tagged `"<class>:CONST"` string (spec §4.3 rules 4 and 5).
///
/// Implementors should resolve [`EnumCodec::resolve`] case-insensitively.
pub trait EnumCodec: Sized {
    /// The enum's registered class name, used in the tagged string form and
    /// in [`DialogStoreError::EnumResolution`] messages.
    fn class_name() -> &'static str;

    /// Whether this enum is written tagged as `"<class>:<constant>"` even
    /// when decoding a bare constant would be unambiguous.
    fn requires_class_tag() -> bool {
        false
    }

    /// Resolves a constant name (case-insensitively) to a value.
    fn resolve(name: &str) -> Option<Self>;
}

impl<E: EnumCodec> Decode for E {
    fn type_hint() -> TypeHint {
        TypeHint::Enum {
            class: E::class_name(),
            requires_class_tag: E::requires_class_tag(),
        }
    }

    fn decode(_ctx: &mut CodecContext, input: &Document, _hint: &TypeHint) -> Result<Self, DialogStoreError> {
        let text = match input {
            Document::String(s) => s.as_str(),
            _ => {
                return Err(DialogStoreError::DecodeFailed(format!(
                    "expected an enum constant string, found {input:?}"
                )));
            }
        };

        // "<class>:<constant>" tagged form, or a bare constant resolved
        // within the declared enum.
        let constant = match text.split_once(':') {
            Some((_class, constant)) => constant,
            None => text,
        };

        E::resolve(constant).ok_or_else(|| DialogStoreError::EnumResolution {
            class: E::class_name(),
            constant: constant.to_string(),
        })
    }
}

/// The mirror of [`Decode`] (spec §4.4).
pub trait Encode {
    /// Encodes `self` into a [`Document`].
    fn encode(&self, ctx: &mut CodecContext) -> Result<Document, DialogStoreError>;
}

impl Encode for Document {
    fn encode(&self, _ctx: &mut CodecContext) -> Result<Document, DialogStoreError> {
        Ok(self.clone())
    }
}

macro_rules! encode_scalar {
    ($ty:ty, $variant:ident, $cast:ty) => {
        impl Encode for $ty {
            fn encode(&self, _ctx: &mut CodecContext) -> Result<Document, DialogStoreError> {
                Ok(Document::$variant(*self as $cast))
            }
        }
    };
}

encode_scalar!(i8, Int, i64);
encode_scalar!(i16, Int, i64);
encode_scalar!(i32, Int, i64);
encode_scalar!(i64, Int, i64);
encode_scalar!(u8, UInt, u64);
encode_scalar!(u16, UInt, u64);
encode_scalar!(u32, UInt, u64);
encode_scalar!(u64, UInt, u64);
encode_scalar!(f32, Float, f64);
encode_scalar!(f64, Float, f64);
encode_scalar!(bool, Bool, bool);

impl Encode for String {
    fn encode(&self, _ctx: &mut CodecContext) -> Result<Document, DialogStoreError> {
        Ok(Document::String(self.clone()))
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(&self, ctx: &mut CodecContext) -> Result<Document, DialogStoreError> {
        match self {
            Some(value) => value.encode(ctx),
            None => Ok(Document::Null),
        }
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, ctx: &mut CodecContext) -> Result<Document, DialogStoreError> {
        let items = self
            .iter()
            .map(|item| item.encode(ctx))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Document::List(items))
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode(&self, ctx: &mut CodecContext) -> Result<Document, DialogStoreError> {
        let items = self
            .iter()
            .map(|item| item.encode(ctx))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Document::List(items))
    }
}

impl<K, V> Encode for HashMap<K, V>
where
    K: MapKey,
    V: Encode,
{
    fn encode(&self, ctx: &mut CodecContext) -> Result<Document, DialogStoreError> {
        if K::STRING_KEYED {
            let mut fields = IndexMap::with_capacity(self.len());
            for (key, value) in self {
                fields.insert(key.encode_key(), value.encode(ctx)?);
            }
            Ok(Document::Map(fields))
        } else {
            let pairs = self
                .iter()
                .map(|(key, value)| {
                    Ok(Document::List(vec![
                        Document::String(key.encode_key()),
                        value.encode(ctx)?,
                    ]))
                })
                .collect::<Result<Vec<_>, DialogStoreError>>()?;
            Ok(Document::List(pairs))
        }
    }
}

impl Encode for Box<dyn DynValue> {
    fn encode(&self, ctx: &mut CodecContext) -> Result<Document, DialogStoreError> {
        let class = ctx
            .class_for_type(self.as_ref())
            .ok_or_else(|| DialogStoreError::CodecMissing("<unregistered concrete type>".to_string()))?;
        let codec = ctx
            .find_codec(class)
            .ok_or_else(|| DialogStoreError::CodecMissing(class.to_string()))?;
        let mut output = EncodeOutput::new();
        output.set_class_tag(class);
        codec.encode_erased(ctx, self.as_ref(), &mut output)?;
        Ok(output.finish())
    }
}
