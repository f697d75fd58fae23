use thiserror::Error;

/// The common error type used by this crate.
#[derive(Error, Debug, Clone)]
pub enum DialogStoreError {
    /// A nested structure appeared where only a scalar primary key was allowed.
    #[error("expected a primitive key, found a nested structure: {0}")]
    NonPrimitiveKey(String),

    /// A map key decoded to a type the key decoder doesn't support.
    #[error("unsupported map key type: {0}")]
    UnsupportedKey(String),

    /// No constant in the target enumeration matched the encoded string.
    #[error("no enum constant named {constant:?} in {class}")]
    EnumResolution {
        /// The enum's registered class name.
        class: &'static str,
        /// The constant name that failed to resolve.
        constant: String,
    },

    /// `find_codec(type)` produced no codec for a type decode required.
    #[error("no codec registered for {0}")]
    CodecMissing(String),

    /// A remote query returned a document with no primary-key field.
    #[error("document is missing its primary key field {0:?}")]
    MissingPrimaryKey(&'static str),

    /// The underlying table reported an I/O or query error.
    #[error("remote table error: {0}")]
    RemoteFailure(String),

    /// A find or save was attempted against a value that failed to decode.
    #[error("decode failed: {0}")]
    DecodeFailed(String),
}
