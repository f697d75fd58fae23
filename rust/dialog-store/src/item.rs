//! The identity-bearing handle owned by a datastore's cache (spec §3
//! `DataItem`, §4.5).

use std::sync::Weak;

use parking_lot::RwLock;

use dialog_common::time::{now, Duration, SystemTime};

use crate::codec::{CodecContext, DataCodec};
use crate::datastore::DatastoreInner;
use crate::document::Document;
use crate::error::DialogStoreError;
use crate::io::{DecodeInput, Encode, EncodeOutput};
use crate::numeric::PrimaryKey;
use crate::query::Query;
use crate::table::DataTable;
use crate::value::DynValue;

struct ItemState<T> {
    value: Option<T>,
    created_time: SystemTime,
    last_fetch_time: Option<Duration>,
    last_reference_time: Duration,
}

/// A handle `(datastore, key, value?, timestamps)` with identity equal to
/// `(datastore, key)` (spec §3, §4.5).
///
/// Holds a non-owning [`Weak`] back-reference to the owning datastore (spec
/// §9 "Back-reference from item to datastore") so that items cached inside
/// a datastore never keep the datastore itself alive.
pub struct DataItem<K, T, Table, Codec> {
    datastore_id: usize,
    datastore: Weak<DatastoreInner<K, T, Table, Codec>>,
    key: K,
    state: RwLock<ItemState<T>>,
}

impl<K, T, Table, Codec> DataItem<K, T, Table, Codec>
where
    K: PrimaryKey,
    T: DynValue + Clone,
    Table: DataTable<K>,
    Codec: DataCodec<K, T>,
{
    pub(crate) fn new(
        datastore_id: usize,
        datastore: Weak<DatastoreInner<K, T, Table, Codec>>,
        key: K,
    ) -> Self {
        Self {
            datastore_id,
            datastore,
            key,
            state: RwLock::new(ItemState {
                value: None,
                created_time: now(),
                last_fetch_time: None,
                last_reference_time: Duration::ZERO,
            }),
        }
    }

    /// The immutable primary key this item is bound to.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// True if a value is currently populated.
    pub fn is_present(&self) -> bool {
        self.state.read().value.is_some()
    }

    /// A clone of the current value, if present.
    pub fn get(&self) -> Option<T> {
        self.state.read().value.clone()
    }

    /// An alias for [`DataItem::get`] (spec §4.5 lists both `get()` and
    /// `optional()`; this crate's `get` already returns `Option<T>`, so the
    /// two are the same accessor).
    pub fn optional(&self) -> Option<T> {
        self.get()
    }

    /// If no value is present, materializes the codec's default for this
    /// key.
    pub fn default_if_absent(&self) -> Result<(), DialogStoreError> {
        let datastore = self.upgrade()?;
        let mut state = self.state.write();
        if state.value.is_none() {
            state.value = Some(datastore.codec.create_default(&self.key));
        }
        Ok(())
    }

    /// Unconditionally replaces the value with a fresh default.
    pub fn reset_to_defaults(&self) -> Result<(), DialogStoreError> {
        let datastore = self.upgrade()?;
        self.state.write().value = Some(datastore.codec.create_default(&self.key));
        Ok(())
    }

    /// Removes this item from its owning datastore's cache.
    pub fn dispose(&self) -> Result<(), DialogStoreError> {
        let datastore = self.upgrade()?;
        datastore.cache.remove(&self.key);
        Ok(())
    }

    /// Populates this item's value from `input` (spec §4.5 `decode`).
    ///
    /// A `null` input leaves the item unchanged -- it is not the same thing
    /// as an absent field inside an otherwise-present document.
    pub fn decode(&self, input: &Document) -> Result<(), DialogStoreError> {
        if input.is_null() {
            return Ok(());
        }
        let datastore = self.upgrade()?;
        let mut ctx = CodecContext::new(&datastore.registry);
        let decode_input = DecodeInput::new(input);
        let mut value = datastore.codec.construct(&mut ctx, &decode_input)?;
        datastore.codec.decode(&mut ctx, &mut value, &decode_input)?;
        self.state.write().value = Some(value);
        self.fetched_now();
        Ok(())
    }

    /// Fetches this item's value from the source table and decodes it.
    pub async fn fetch_async(&self) -> Result<(), DialogStoreError> {
        let datastore = self.upgrade()?;
        let query = Query::by_key(self.key.clone());
        let document = datastore
            .table
            .find_one_async(&query)
            .await
            .map_err(Into::into)?;
        match document {
            Some(document) => self.decode(&document),
            None => Ok(()),
        }
    }

    /// Blocking variant of [`DataItem::fetch_async`].
    ///
    /// Must be called from outside an async task -- it blocks the current
    /// thread on the current tokio runtime.
    pub fn fetch_sync(&self) -> Result<(), DialogStoreError> {
        tokio::runtime::Handle::current().block_on(self.fetch_async())
    }

    /// Encodes and saves this item's value, if present (spec §4.5
    /// `save_sync`/`save_async`: a no-op when the value is absent).
    pub async fn save_async(&self) -> Result<(), DialogStoreError> {
        let datastore = self.upgrade()?;
        let value = match self.get() {
            Some(value) => value,
            None => return Ok(()),
        };

        let mut ctx = CodecContext::new(&datastore.registry);
        let mut output = EncodeOutput::new();
        output.write(datastore.codec.primary_key_field_name(), self.key.encode(&mut ctx)?);
        datastore.codec.encode(&mut ctx, &value, &mut output)?;

        datastore
            .table
            .replace_one(&self.key, output.finish())
            .await
            .map_err(Into::into)
    }

    /// Blocking variant of [`DataItem::save_async`].
    ///
    /// Must be called from outside an async task -- it blocks the current
    /// thread on the current tokio runtime.
    pub fn save_sync(&self) -> Result<(), DialogStoreError> {
        tokio::runtime::Handle::current().block_on(self.save_async())
    }

    pub(crate) fn referenced_now(&self) {
        let mut state = self.state.write();
        let elapsed = now().duration_since(state.created_time).unwrap_or(Duration::ZERO);
        state.last_reference_time = state.last_reference_time.max(elapsed);
    }

    fn fetched_now(&self) {
        let mut state = self.state.write();
        let elapsed = now().duration_since(state.created_time).unwrap_or(Duration::ZERO);
        state.last_fetch_time = Some(state.last_fetch_time.unwrap_or(Duration::ZERO).max(elapsed));
    }

    /// The offset since creation at which this item was last referenced,
    /// used by the cache's LRU eviction policy.
    pub fn last_reference_time(&self) -> Duration {
        self.state.read().last_reference_time
    }

    fn upgrade(&self) -> Result<std::sync::Arc<DatastoreInner<K, T, Table, Codec>>, DialogStoreError> {
        self.datastore.upgrade().ok_or_else(|| {
            DialogStoreError::RemoteFailure("the owning datastore has been dropped".to_string())
        })
    }
}

impl<K, T, Table, Codec> PartialEq for DataItem<K, T, Table, Codec>
where
    K: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.datastore_id == other.datastore_id && self.key == other.key
    }
}

impl<K, T, Table, Codec> Eq for DataItem<K, T, Table, Codec> where K: Eq {}

impl<K, T, Table, Codec> std::hash::Hash for DataItem<K, T, Table, Codec>
where
    K: std::hash::Hash,
{
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.datastore_id.hash(state);
        self.key.hash(state);
    }
}
