//! Explicit type descriptors for the decode/encode dispatch.
//!
//! The original reflective implementation discovers element, key, and value
//! types by inspecting parameterized-type metadata at each call site. A
//! statically typed rewrite gets that descriptor for free at monomorphized
//! call sites (a `Vec<i32>::decode` call simply *is* "list of i32"); the one
//! place the descriptor still has to travel at runtime is the boundary where
//! a `__class` tag selects a codec dynamically — enumerations and
//! polymorphic object fields. [`TypeHint`] is that descriptor, per the
//! re-architecture guidance in the design notes.

/// A type-directed descriptor used to steer decode at the dynamic boundary
/// (registry lookups for enums and polymorphic objects).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeHint {
    /// No static expectation; any shape is accepted as-is.
    Any,
    /// A scalar primitive.
    Scalar(ScalarKind),
    /// A homogeneous, variable-length list.
    List(Box<TypeHint>),
    /// A fixed-size array of a known component type and length.
    Array(Box<TypeHint>, usize),
    /// A map from a key type to a value type.
    Map(Box<TypeHint>, Box<TypeHint>),
    /// An enumeration, named by its registered class.
    Enum {
        /// The enum's registered class name.
        class: &'static str,
        /// Whether values are written tagged as `"<class>:<constant>"`.
        requires_class_tag: bool,
    },
    /// A polymorphic object, named by its statically expected class.
    Object(&'static str),
}

/// The scalar primitive kinds the numeric coercion table understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarKind {
    /// `bool`.
    Bool,
    /// A signed integer of any width.
    SignedInt,
    /// An unsigned integer of any width.
    UnsignedInt,
    /// A floating point number of any width.
    Float,
    /// `String`.
    String,
}
