//! The codec registry and the per-class `DataCodec` contract (spec §4.2).

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::DialogStoreError;
use crate::io::{DecodeInput, EncodeOutput};
use crate::query::Query;
use crate::value::DynValue;

/// Translates a single registered type `T`, keyed by `K`, to and from a
/// [`crate::Document`].
///
/// `construct` and `decode` are split so that polymorphic classes can
/// resolve their concrete type (and cyclic or self-referential objects can
/// register a placeholder) before fields are populated.
pub trait DataCodec<K, T>: Send + Sync
where
    T: DynValue,
{
    /// The document field name the primary key is stored under.
    fn primary_key_field_name(&self) -> &'static str;

    /// Allocates a bare value, reading only what is needed to choose a
    /// concrete class.
    fn construct(
        &self,
        ctx: &mut CodecContext,
        input: &DecodeInput,
    ) -> Result<T, DialogStoreError>;

    /// Populates fields on an already-constructed value.
    fn decode(
        &self,
        ctx: &mut CodecContext,
        value: &mut T,
        input: &DecodeInput,
    ) -> Result<(), DialogStoreError>;

    /// Emits fields of `value` to `output`.
    fn encode(
        &self,
        ctx: &mut CodecContext,
        value: &T,
        output: &mut EncodeOutput,
    ) -> Result<(), DialogStoreError>;

    /// The value installed on a freshly materialized item for `key`.
    fn create_default(&self, key: &K) -> T;

    /// Compiles a query's field constraints into a value predicate used by
    /// cache scans.
    fn query_predicate(&self, query: &Query<K>) -> Box<dyn Fn(&T) -> bool + Send + Sync>;
}

/// The type-erased form of a [`DataCodec`], used at the dynamic dispatch
/// boundary (spec §4.3 rule 6): resolving a `__class` tag on a nested
/// document to a concrete codec without the caller's static type knowing
/// which concrete class that will be.
pub trait ErasedCodec: Send + Sync + Debug {
    /// The class name this codec is registered under.
    fn class_name(&self) -> &'static str;

    /// The [`TypeId`] of the concrete value type this codec handles, used
    /// to find a codec for an already-constructed erased value on the
    /// encode path, where there is no `__class` tag to read yet.
    fn value_type_id(&self) -> TypeId;

    /// See [`DataCodec::construct`], operating on the erased value.
    fn construct_erased(
        &self,
        ctx: &mut CodecContext,
        input: &DecodeInput,
    ) -> Result<Box<dyn DynValue>, DialogStoreError>;

    /// See [`DataCodec::decode`], operating on the erased value.
    fn decode_erased(
        &self,
        ctx: &mut CodecContext,
        value: &mut dyn DynValue,
        input: &DecodeInput,
    ) -> Result<(), DialogStoreError>;

    /// See [`DataCodec::encode`], operating on the erased value.
    fn encode_erased(
        &self,
        ctx: &mut CodecContext,
        value: &dyn DynValue,
        output: &mut EncodeOutput,
    ) -> Result<(), DialogStoreError>;
}

/// Adapts a concrete, statically typed codec for an unkeyed value type `T`
/// (no primary key is involved at this boundary — only nested or
/// polymorphic values travel through [`ErasedCodec`]) into the registry's
/// erased form.
pub struct PolymorphicCodec<T, C> {
    class: &'static str,
    inner: C,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T, C> PolymorphicCodec<T, C> {
    /// Wraps `inner`, registering it under `class`.
    pub fn new(class: &'static str, inner: C) -> Self {
        Self {
            class,
            inner,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T, C> Debug for PolymorphicCodec<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolymorphicCodec")
            .field("class", &self.class)
            .finish()
    }
}

/// The unkeyed half of [`DataCodec`], used for values that only ever appear
/// nested inside another record (no primary key of their own).
pub trait ValueCodec<T>: Send + Sync
where
    T: DynValue,
{
    /// See [`DataCodec::construct`].
    fn construct(
        &self,
        ctx: &mut CodecContext,
        input: &DecodeInput,
    ) -> Result<T, DialogStoreError>;

    /// See [`DataCodec::decode`].
    fn decode(
        &self,
        ctx: &mut CodecContext,
        value: &mut T,
        input: &DecodeInput,
    ) -> Result<(), DialogStoreError>;

    /// See [`DataCodec::encode`].
    fn encode(
        &self,
        ctx: &mut CodecContext,
        value: &T,
        output: &mut EncodeOutput,
    ) -> Result<(), DialogStoreError>;
}

impl<T, C> ErasedCodec for PolymorphicCodec<T, C>
where
    T: DynValue + Clone,
    C: ValueCodec<T>,
{
    fn class_name(&self) -> &'static str {
        self.class
    }

    fn value_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn construct_erased(
        &self,
        ctx: &mut CodecContext,
        input: &DecodeInput,
    ) -> Result<Box<dyn DynValue>, DialogStoreError> {
        Ok(Box::new(self.inner.construct(ctx, input)?))
    }

    fn decode_erased(
        &self,
        ctx: &mut CodecContext,
        value: &mut dyn DynValue,
        input: &DecodeInput,
    ) -> Result<(), DialogStoreError> {
        let typed = value
            .downcast_mut::<T>()
            .ok_or_else(|| DialogStoreError::CodecMissing(self.class.to_string()))?;
        self.inner.decode(ctx, typed, input)
    }

    fn encode_erased(
        &self,
        ctx: &mut CodecContext,
        value: &dyn DynValue,
        output: &mut EncodeOutput,
    ) -> Result<(), DialogStoreError> {
        let typed = value
            .downcast_ref::<T>()
            .ok_or_else(|| DialogStoreError::CodecMissing(self.class.to_string()))?;
        self.inner.encode(ctx, typed, output)
    }
}

/// A lookup service from class name to registered codec.
///
/// Populated once at startup and treated as read-only thereafter (spec §5
/// "Shared-resource policy").
#[derive(Default)]
pub struct CodecRegistry {
    by_class: HashMap<&'static str, Arc<dyn ErasedCodec>>,
    by_type: HashMap<TypeId, &'static str>,
}

impl CodecRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `codec` under its own `class_name()`.
    pub fn register(&mut self, codec: Arc<dyn ErasedCodec>) {
        self.by_type.insert(codec.value_type_id(), codec.class_name());
        self.by_class.insert(codec.class_name(), codec);
    }

    /// Looks up a codec by its registered class name.
    pub fn find_by_class(&self, class: &str) -> Option<Arc<dyn ErasedCodec>> {
        self.by_class.get(class).cloned()
    }

    /// Looks up the registered class name for a concrete value type, used
    /// on the encode path to find a tag for an already-constructed value.
    pub fn find_class_by_type(&self, type_id: TypeId) -> Option<&'static str> {
        self.by_type.get(&type_id).copied()
    }
}

/// Per-operation scratch carrying a back-reference to the codec registry.
///
/// Lives only for the duration of one encode or decode invocation tree
/// (spec §3 "CodecContext").
pub struct CodecContext<'a> {
    registry: &'a CodecRegistry,
}

impl<'a> CodecContext<'a> {
    /// Begins a new decode/encode operation against `registry`.
    pub fn new(registry: &'a CodecRegistry) -> Self {
        Self { registry }
    }

    /// Resolves a `__class` tag (or a statically expected class) to its
    /// codec. Callers are responsible for the class-tag-miss fallback
    /// described in spec §4.3 ("Class-tag miss").
    pub fn find_codec(&self, class: &str) -> Option<Arc<dyn ErasedCodec>> {
        self.registry.find_by_class(class)
    }

    /// Resolves a registered class name for an already-constructed erased
    /// value (spec §4.4 encode mirror of the class-tag dispatch).
    pub fn class_for_type(&self, value: &dyn DynValue) -> Option<&'static str> {
        self.registry.find_class_by_type(value.as_any().type_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::DecodeInput;
    use crate::Document;

    #[derive(Clone, Debug, PartialEq)]
    struct Point {
        x: i64,
        y: i64,
    }

    struct PointCodec;

    impl ValueCodec<Point> for PointCodec {
        fn construct(
            &self,
            _ctx: &mut CodecContext,
            _input: &DecodeInput,
        ) -> Result<Point, DialogStoreError> {
            Ok(Point { x: 0, y: 0 })
        }

        fn decode(
            &self,
            _ctx: &mut CodecContext,
            value: &mut Point,
            input: &DecodeInput,
        ) -> Result<(), DialogStoreError> {
            value.x = input.field_i64("x").unwrap_or(0);
            value.y = input.field_i64("y").unwrap_or(0);
            Ok(())
        }

        fn encode(
            &self,
            _ctx: &mut CodecContext,
            value: &Point,
            output: &mut EncodeOutput,
        ) -> Result<(), DialogStoreError> {
            output.write("x", Document::Int(value.x));
            output.write("y", Document::Int(value.y));
            Ok(())
        }
    }

    #[test]
    fn it_resolves_a_registered_class_by_name() {
        let mut registry = CodecRegistry::new();
        registry.register(Arc::new(PolymorphicCodec::new("pkg.Point", PointCodec)));

        assert!(registry.find_by_class("pkg.Point").is_some());
        assert!(registry.find_by_class("pkg.Missing").is_none());
    }

    #[test]
    fn it_constructs_and_decodes_through_the_erased_boundary() {
        let mut registry = CodecRegistry::new();
        registry.register(Arc::new(PolymorphicCodec::new("pkg.Point", PointCodec)));
        let mut ctx = CodecContext::new(&registry);

        let codec = registry.find_by_class("pkg.Point").unwrap();
        let mut fields = indexmap::IndexMap::new();
        fields.insert("x".to_string(), Document::Int(3));
        fields.insert("y".to_string(), Document::Int(4));
        let input = DecodeInput::new(&Document::Map(fields));

        let mut value = codec.construct_erased(&mut ctx, &input).unwrap();
        codec.decode_erased(&mut ctx, value.as_mut(), &input).unwrap();

        let point = value.downcast_ref::<Point>().unwrap();
        assert_eq!(point, &Point { x: 3, y: 4 });
    }
}
