//! The keyed index of live items (spec §3 `DataCache`, §4.6).

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;

use crate::item::DataItem;

/// Stores items by key; provides single-flight get-or-compute, get-or-null,
/// linear iteration, removal, and LRU-by-`last_reference_time` eviction
/// (spec §4.6).
///
/// [`dashmap`] gives us both the concurrent map and the single-flight
/// guarantee for free: `entry(key).or_insert_with(ctor)` holds that shard's
/// lock across the whole get-or-insert, so two concurrent callers for the
/// same absent key can never both run `ctor`.
pub struct DataCache<K, T, Table, Codec> {
    items: DashMap<K, Arc<DataItem<K, T, Table, Codec>>>,
}

impl<K, T, Table, Codec> Default for DataCache<K, T, Table, Codec>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T, Table, Codec> DataCache<K, T, Table, Codec>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self { items: DashMap::new() }
    }

    /// Returns the cached item for `key`, calling `ctor` to create and
    /// insert one if absent. At most one `ctor` call wins per key, even
    /// under concurrent calls (spec §5 "Single-flight").
    pub fn get_or_compute(
        &self,
        key: &K,
        ctor: impl FnOnce() -> Arc<DataItem<K, T, Table, Codec>>,
    ) -> Arc<DataItem<K, T, Table, Codec>> {
        self.items.entry(key.clone()).or_insert_with(ctor).clone()
    }

    /// Returns the cached item for `key`, if any, without creating one.
    pub fn get_or_null(&self, key: &K) -> Option<Arc<DataItem<K, T, Table, Codec>>> {
        self.items.get(key).map(|entry| entry.clone())
    }

    /// Removes the cached item for `key`, if present.
    pub fn remove(&self, key: &K) -> Option<Arc<DataItem<K, T, Table, Codec>>> {
        self.items.remove(key).map(|(_, item)| item)
    }

    /// The number of items currently cached.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if the cache currently holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// A snapshot of every cached item, for linear scans (spec §4.7
    /// `find_one_cached`/`find_all_cached`).
    pub fn snapshot(&self) -> Vec<Arc<DataItem<K, T, Table, Codec>>> {
        self.items.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Evicts the least-recently-referenced items until at most `capacity`
    /// remain.
    pub fn evict_to_capacity(&self, capacity: usize) {
        if self.items.len() <= capacity {
            return;
        }
        let mut snapshot: Vec<_> = self
            .items
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().last_reference_time()))
            .collect();
        snapshot.sort_by_key(|(_, last_reference_time)| *last_reference_time);
        let excess = snapshot.len() - capacity;
        for (key, _) in snapshot.into_iter().take(excess) {
            self.items.remove(&key);
        }
    }
}
