#![warn(missing_docs)]

//! A typed, cached object-mapping layer over a document-shaped remote
//! table.
//!
//! Application code asks a [`Datastore`] for items by primary key, reads
//! and mutates their typed value, and saves or fetches against a
//! [`DataTable`]. The datastore deduplicates identity (at most one live
//! [`DataItem`] per key), caches loaded values, and drives the codec
//! pipeline that translates between domain types and a generic
//! [`Document`] tree -- including polymorphic classes, enumerations, and
//! parameterized containers.
//!
//! What this crate does *not* do: talk to any particular document
//! database, choose a wire encoding, or register codecs on your behalf.
//! Those are the concerns of a [`DataTable`] implementation and of the
//! [`CodecRegistry`] the caller assembles.

mod cache;
mod codec;
mod datastore;
mod document;
mod error;
mod hint;
mod item;
mod io;
mod numeric;
mod query;
mod status;
mod table;
mod value;

pub use cache::DataCache;
pub use codec::{CodecContext, CodecRegistry, DataCodec, ErasedCodec, PolymorphicCodec, ValueCodec};
pub use datastore::Datastore;
pub use document::{Document, CLASS_TAG_FIELD};
pub use error::DialogStoreError;
pub use hint::{ScalarKind, TypeHint};
pub use item::DataItem;
pub use io::{Decode, DecodeInput, Encode, EncodeOutput, EnumCodec};
pub use numeric::{MapKey, PrimaryKey};
pub use query::{FieldConstraint, Query};
pub use status::{FindAllStatus, FindAllStatusCompleter, FindStatus, FindStatusCompleter, Outcome};
pub use table::DataTable;
#[cfg(any(test, feature = "testing"))]
pub use table::MemoryDataTable;
pub use value::DynValue;
