//! The façade orchestrating cache lookup, remote queries, and codec-driven
//! decode (spec §3 `Datastore`, §4.7).

use std::sync::Arc;

use crate::cache::DataCache;
use crate::codec::{CodecRegistry, DataCodec};
use crate::document::Document;
use crate::io::DecodeInput;
use crate::item::DataItem;
use crate::numeric::PrimaryKey;
use crate::query::Query;
use crate::status::{pending, FindAllStatus, FindStatus, Outcome};
use crate::table::DataTable;
use crate::value::DynValue;

/// The shared state behind a [`Datastore`] handle. [`DataItem`] holds a
/// [`std::sync::Weak`] reference to this, never a strong one, so the cache
/// an item lives in does not keep its own datastore alive forever (spec §9
/// "Back-reference from item to datastore").
pub(crate) struct DatastoreInner<K, T, Table, Codec> {
    pub(crate) cache: DataCache<K, T, Table, Codec>,
    pub(crate) table: Table,
    pub(crate) codec: Codec,
    pub(crate) registry: CodecRegistry,
}

/// A typed façade over one remote [`DataTable`] plus its local [`DataCache`]
/// (spec §3, §4.7).
///
/// Constructed explicitly field-by-field, the way `dialog_storage::Storage`
/// is assembled from an `Encoder` and a `StorageBackend`: there is no
/// configuration file or environment variable in play, just the caller
/// handing over the table, the codec, and the codec registry used to
/// resolve this type's polymorphic fields.
pub struct Datastore<K, T, Table, Codec> {
    inner: Arc<DatastoreInner<K, T, Table, Codec>>,
}

impl<K, T, Table, Codec> Clone for Datastore<K, T, Table, Codec> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<K, T, Table, Codec> Datastore<K, T, Table, Codec>
where
    K: PrimaryKey,
    T: DynValue + Clone,
    Table: DataTable<K> + Send + Sync + 'static,
    Codec: DataCodec<K, T> + Send + Sync + 'static,
{
    /// Builds a datastore over `table`, using `codec` as the primary
    /// type's codec and `registry` to resolve any nested polymorphic
    /// fields that codec's `decode`/`encode` delegate to.
    pub fn new(table: Table, codec: Codec, registry: CodecRegistry) -> Self {
        Self {
            inner: Arc::new(DatastoreInner {
                cache: DataCache::new(),
                table,
                codec,
                registry,
            }),
        }
    }

    fn datastore_id(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    /// Returns the cached item for `key`, creating (but not populating) one
    /// if absent.
    pub fn get_or_reference(&self, key: &K) -> Arc<DataItem<K, T, Table, Codec>> {
        let datastore_id = self.datastore_id();
        let weak = Arc::downgrade(&self.inner);
        self.inner
            .cache
            .get_or_compute(key, || Arc::new(DataItem::new(datastore_id, weak, key.clone())))
    }

    /// [`Datastore::get_or_reference`], then materializes a default value
    /// if the item had none.
    pub fn get_or_create(&self, key: &K) -> Result<Arc<DataItem<K, T, Table, Codec>>, crate::error::DialogStoreError> {
        let item = self.get_or_reference(key);
        item.default_if_absent()?;
        Ok(item)
    }

    /// The item's current value for `key`, referencing but never creating
    /// an item (spec §6 "Public surface": `get_optional`).
    pub fn get_optional(&self, key: &K) -> Option<T> {
        self.get_or_null(key).and_then(|item| item.get())
    }

    /// The cached item for `key`, if any, without creating one (spec §6
    /// "Public surface": `get_or_null`).
    pub fn get_or_null(&self, key: &K) -> Option<Arc<DataItem<K, T, Table, Codec>>> {
        self.inner.cache.get_or_null(key)
    }

    /// Probes the cache only: a direct lookup if `query` carries a key,
    /// otherwise a linear scan using the codec's compiled predicate.
    pub fn find_one_cached(&self, query: &Query<K>) -> Option<Arc<DataItem<K, T, Table, Codec>>> {
        let found = match query.key() {
            Some(key) => self
                .inner
                .cache
                .get_or_null(key)
                .filter(|item| item.is_present()),
            None => {
                let predicate = self.inner.codec.query_predicate(query);
                self.inner
                    .cache
                    .snapshot()
                    .into_iter()
                    .find(|item| item.get().is_some_and(|value| predicate(&value)))
            }
        };
        if let Some(item) = &found {
            item.referenced_now();
        }
        found
    }

    /// Every cached item matching `query` (spec §4.7: pre-sized to roughly
    /// `cache_size / (field_constraint_count + 1)`).
    pub fn find_all_cached(&self, query: &Query<K>) -> Vec<Arc<DataItem<K, T, Table, Codec>>> {
        let predicate = self.inner.codec.query_predicate(query);
        let snapshot = self.inner.cache.snapshot();
        let capacity = snapshot.len() / (query.constraints().len() + 1);
        let mut matches = Vec::with_capacity(capacity);
        for item in snapshot {
            if item.get().is_some_and(|value| predicate(&value)) {
                item.referenced_now();
                matches.push(item);
            }
        }
        matches
    }

    /// Resolves `query` against the cache first; on a miss, issues a remote
    /// find and decodes the result into a cache-resolved item. Returns a
    /// handle completed exactly once (spec §4.7 "Find-one state machine").
    ///
    /// Accepts either a full [`Query`] or a bare key (spec §6 "Public
    /// surface" lists `find_one(Query)` and `find_one(K)` as two
    /// overloads; `impl Into<Query<K>>` is the idiomatic stand-in for
    /// overloading on a single method).
    pub fn find_one(&self, query: impl Into<Query<K>>) -> FindStatus<Arc<DataItem<K, T, Table, Codec>>> {
        let query = query.into();
        if let Some(item) = self.find_one_cached(&query) {
            return FindStatus::ready(Outcome::Cached(item));
        }

        let (completer, status) = pending();
        let datastore = self.clone();
        spawn_detached(async move {
            let outcome = datastore.resolve_remote(&query).await;
            completer.complete(outcome);
        });
        status
    }

    /// The remote counterpart of [`Datastore::find_all_cached`]: always
    /// issues a remote query, decoding every returned document into a
    /// cache-resolved item.
    pub fn find_all(&self, query: impl Into<Query<K>>) -> FindAllStatus<Arc<DataItem<K, T, Table, Codec>>> {
        let query = query.into();
        let (completer, status) = pending();
        let datastore = self.clone();
        spawn_detached(async move {
            let outcome = datastore.resolve_remote_all(&query).await;
            completer.complete(outcome);
        });
        status
    }

    async fn resolve_remote(
        &self,
        query: &Query<K>,
    ) -> Outcome<Arc<DataItem<K, T, Table, Codec>>> {
        match self.inner.table.find_one_async(query).await {
            Ok(Some(document)) => match self.decode_into_item(query, &document) {
                Ok(item) => Outcome::Fetched(item),
                Err(error) => Outcome::Failed(error),
            },
            Ok(None) => Outcome::Absent,
            Err(error) => Outcome::Failed(error.into()),
        }
    }

    async fn resolve_remote_all(
        &self,
        query: &Query<K>,
    ) -> Outcome<Vec<Arc<DataItem<K, T, Table, Codec>>>> {
        match self.inner.table.find_all_async(query).await {
            Ok(documents) => {
                let mut items = Vec::with_capacity(documents.len());
                for document in &documents {
                    match self.decode_into_item(query, document) {
                        Ok(item) => items.push(item),
                        Err(error) => return Outcome::Failed(error),
                    }
                }
                Outcome::Fetched(items)
            }
            Err(error) => Outcome::Failed(error.into()),
        }
    }

    fn decode_into_item(
        &self,
        query: &Query<K>,
        document: &Document,
    ) -> Result<Arc<DataItem<K, T, Table, Codec>>, crate::error::DialogStoreError> {
        let key = match query.key() {
            Some(key) => key.clone(),
            None => {
                let field_name = self.inner.codec.primary_key_field_name();
                DecodeInput::new(document).read_key::<K>(field_name)?
            }
        };
        let item = self.get_or_reference(&key);
        item.decode(document)?;
        Ok(item)
    }
}

/// Fire-and-forget task spawning, mirroring `dialog_common::spawn`'s
/// per-platform dispatch but without awaiting a join handle -- `find_one`
/// and `find_all` must return their status immediately.
fn spawn_detached<F>(future: F)
where
    F: std::future::Future<Output = ()> + dialog_common::ConditionalSend + 'static,
{
    #[cfg(target_arch = "wasm32")]
    {
        wasm_bindgen_futures::spawn_local(future);
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        tokio::spawn(future);
    }
}
