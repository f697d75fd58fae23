//! Numeric coercion rules used by the decode pipeline (spec §6, §4.3 rule 7)
//! and by the string <-> map-key conversion used for non-string-keyed maps
//! (spec §4.3 "String->key conversion", §6 "Map keys are serialized as
//! strings").

use std::hash::Hash;

use crate::document::Document;
use crate::error::DialogStoreError;
use crate::io::Encode;

/// Coerces a scalar [`Document`] into a signed 64-bit integer.
///
/// Booleans follow `0 == false`, nonzero `== true`; floats truncate toward
/// zero. Returns `None` for non-scalar or string documents, which are not
/// part of the numeric coercion table.
pub fn document_to_i64(doc: &Document) -> Option<i64> {
    match doc {
        Document::Int(n) => Some(*n),
        Document::UInt(n) => Some(*n as i64),
        Document::Float(f) => Some(*f as i64),
        Document::Bool(b) => Some(*b as i64),
        _ => None,
    }
}

/// Coerces a scalar [`Document`] into an unsigned 64-bit integer.
pub fn document_to_u64(doc: &Document) -> Option<u64> {
    match doc {
        Document::Int(n) => Some(*n as u64),
        Document::UInt(n) => Some(*n),
        Document::Float(f) => Some(*f as u64),
        Document::Bool(b) => Some(*b as u64),
        _ => None,
    }
}

/// Coerces a scalar [`Document`] into a double-precision float.
pub fn document_to_f64(doc: &Document) -> Option<f64> {
    match doc {
        Document::Int(n) => Some(*n as f64),
        Document::UInt(n) => Some(*n as f64),
        Document::Float(f) => Some(*f),
        Document::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Coerces a scalar [`Document`] into a boolean (`0 == false`, nonzero `==
/// true`).
pub fn document_to_bool(doc: &Document) -> Option<bool> {
    match doc {
        Document::Bool(b) => Some(*b),
        Document::Int(n) => Some(*n != 0),
        Document::UInt(n) => Some(*n != 0),
        Document::Float(f) => Some(*f != 0.0),
        _ => None,
    }
}

/// Reinterprets the bits of a `f64` as a signed 64-bit integer, preserving
/// NaN payloads and signed zero exactly. This is the round-trip the encoder
/// uses to serialize a float-typed map key as decimal text.
pub fn float_bits_as_i64(value: f64) -> i64 {
    value.to_bits() as i64
}

/// The inverse of [`float_bits_as_i64`].
pub fn i64_as_float_bits(bits: i64) -> f64 {
    f64::from_bits(bits as u64)
}

/// A type that can appear as the key of a non-string-keyed map, and so must
/// be recoverable from (and serializable to) the map key's string form.
pub trait MapKey: Sized {
    /// Whether this key type is serialized as a document/map node (`true`,
    /// `String`) or flattened to a `[[key, value], ...]` list (`false`,
    /// every other key type) -- spec §6.
    const STRING_KEYED: bool = false;

    /// Parse this type from its serialized string form (spec §4.3
    /// "String->key conversion").
    fn decode_key(text: &str) -> Result<Self, DialogStoreError>;

    /// Serialize this type to its string form (spec §6 "Map keys are
    /// serialized as strings").
    fn encode_key(&self) -> String;
}

impl MapKey for String {
    const STRING_KEYED: bool = true;

    fn decode_key(text: &str) -> Result<Self, DialogStoreError> {
        Ok(text.to_owned())
    }

    fn encode_key(&self) -> String {
        self.clone()
    }
}

macro_rules! integer_map_key {
    ($ty:ty) => {
        impl MapKey for $ty {
            fn decode_key(text: &str) -> Result<Self, DialogStoreError> {
                text.parse::<i64>()
                    .map_err(|_| DialogStoreError::UnsupportedKey(text.to_owned()))
                    .map(|n| n as $ty)
            }

            fn encode_key(&self) -> String {
                (*self as i64).to_string()
            }
        }
    };
}

integer_map_key!(i8);
integer_map_key!(i16);
integer_map_key!(i32);
integer_map_key!(i64);
integer_map_key!(u8);
integer_map_key!(u16);
integer_map_key!(u32);
integer_map_key!(u64);

impl MapKey for f64 {
    fn decode_key(text: &str) -> Result<Self, DialogStoreError> {
        let bits = text
            .parse::<i64>()
            .map_err(|_| DialogStoreError::UnsupportedKey(text.to_owned()))?;
        Ok(i64_as_float_bits(bits))
    }

    fn encode_key(&self) -> String {
        float_bits_as_i64(*self).to_string()
    }
}

impl MapKey for f32 {
    fn decode_key(text: &str) -> Result<Self, DialogStoreError> {
        f64::decode_key(text).map(|value| value as f32)
    }

    fn encode_key(&self) -> String {
        (*self as f64).encode_key()
    }
}

/// Bound satisfied by every primary-key type this crate supports out of the
/// box: a scalar that can serve as a non-string map key and also be written
/// back into a document as the primary-key field (spec §4.1, §4.5).
pub trait PrimaryKey: MapKey + Encode + Clone + Eq + Hash + Send + Sync + 'static {}

impl<T> PrimaryKey for T where T: MapKey + Encode + Clone + Eq + Hash + Send + Sync + 'static {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_round_trips_an_integer_map_key() {
        let key: i32 = MapKey::decode_key("42").unwrap();
        assert_eq!(key, 42);
        assert_eq!(key.encode_key(), "42");
    }

    #[test]
    fn it_round_trips_a_float_map_key_through_its_bit_pattern() {
        let encoded = 1.5f64.encode_key();
        assert_eq!(encoded, "4609434218613702656");
        let decoded: f64 = MapKey::decode_key(&encoded).unwrap();
        assert_eq!(decoded, 1.5);
    }

    #[test]
    fn it_rejects_an_unparseable_float_map_key() {
        let err = f64::decode_key("not-a-number").unwrap_err();
        assert!(matches!(err, DialogStoreError::UnsupportedKey(_)));
    }

    #[test]
    fn it_coerces_bool_to_and_from_integers() {
        assert_eq!(document_to_bool(&Document::Int(0)), Some(false));
        assert_eq!(document_to_bool(&Document::Int(7)), Some(true));
        assert_eq!(document_to_i64(&Document::Bool(true)), Some(1));
        assert_eq!(document_to_i64(&Document::Bool(false)), Some(0));
    }
}
