//! The remote document table abstraction (spec §1 "Out of scope": "the core
//! only sees a `DataTable` abstraction producing/consuming document
//! trees"), plus an in-memory fixture for tests.

use async_trait::async_trait;
use dialog_common::{ConditionalSend, ConditionalSync};

use crate::document::Document;
use crate::error::DialogStoreError;
use crate::query::Query;

/// The source of truth a [`crate::Datastore`] fetches from and saves to.
///
/// This crate has no opinion on what backs an implementation -- a real
/// document database, an HTTP API, anything that can produce and consume
/// [`Document`] trees keyed by `K`.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait DataTable<K>: ConditionalSend + ConditionalSync {
    /// The error type this table's backing I/O can produce.
    type Error: Into<DialogStoreError> + ConditionalSend;

    /// Finds at most one document matching `query`.
    async fn find_one_async(&self, query: &Query<K>) -> Result<Option<Document>, Self::Error>;

    /// Finds every document matching `query`.
    async fn find_all_async(&self, query: &Query<K>) -> Result<Vec<Document>, Self::Error>;

    /// Upserts `document` under `key`.
    async fn replace_one(&self, key: &K, document: Document) -> Result<(), Self::Error>;
}

#[cfg(any(test, feature = "testing"))]
pub use memory::MemoryDataTable;

#[cfg(any(test, feature = "testing"))]
mod memory {
    use std::collections::HashMap;
    use std::hash::Hash;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::RwLock;

    use super::DataTable;
    use crate::document::Document;
    use crate::error::DialogStoreError;
    use crate::query::Query;

    /// A trivial in-memory [`DataTable`], backed by a [`HashMap`], used by
    /// this crate's own integration tests and available to downstream
    /// crates under the `testing` feature.
    #[derive(Clone, Default)]
    pub struct MemoryDataTable<K>
    where
        K: Eq + Hash,
    {
        entries: Arc<RwLock<HashMap<K, Document>>>,
    }

    impl<K> MemoryDataTable<K>
    where
        K: Eq + Hash,
    {
        /// Creates an empty table.
        pub fn new() -> Self {
            Self {
                entries: Arc::new(RwLock::new(HashMap::new())),
            }
        }

        /// Seeds the table with a document, bypassing `replace_one`.
        pub async fn seed(&self, key: K, document: Document) {
            self.entries.write().await.insert(key, document);
        }
    }

    fn matches<K>(document: &Document, query: &Query<K>) -> bool {
        query
            .constraints()
            .iter()
            .all(|constraint| document.field(&constraint.field) == Some(&constraint.expected))
    }

    #[cfg_attr(not(target_arch = "wasm32"), async_trait)]
    #[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
    impl<K> DataTable<K> for MemoryDataTable<K>
    where
        K: Clone + Eq + Hash + Send + Sync,
    {
        type Error = DialogStoreError;

        async fn find_one_async(&self, query: &Query<K>) -> Result<Option<Document>, Self::Error> {
            let entries = self.entries.read().await;
            if let Some(key) = query.key() {
                return Ok(entries.get(key).filter(|doc| matches(doc, query)).cloned());
            }
            Ok(entries.values().find(|doc| matches(doc, query)).cloned())
        }

        async fn find_all_async(&self, query: &Query<K>) -> Result<Vec<Document>, Self::Error> {
            let entries = self.entries.read().await;
            if let Some(key) = query.key() {
                return Ok(entries
                    .get(key)
                    .filter(|doc| matches(doc, query))
                    .cloned()
                    .into_iter()
                    .collect());
            }
            Ok(entries.values().filter(|doc| matches(doc, query)).cloned().collect())
        }

        async fn replace_one(&self, key: &K, document: Document) -> Result<(), Self::Error> {
            self.entries.write().await.insert(key.clone(), document);
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use indexmap::IndexMap;

        #[tokio::test]
        async fn it_finds_one_by_key() {
            let table: MemoryDataTable<i64> = MemoryDataTable::new();
            let mut fields = IndexMap::new();
            fields.insert("name".to_string(), Document::String("alice".into()));
            table.seed(1, Document::Map(fields)).await;

            let found = table.find_one_async(&Query::by_key(1)).await.unwrap();
            assert!(found.is_some());
            assert!(table.find_one_async(&Query::by_key(2)).await.unwrap().is_none());
        }

        #[tokio::test]
        async fn it_finds_all_by_field_constraint() {
            let table: MemoryDataTable<i64> = MemoryDataTable::new();
            for (key, name) in [(1, "alice"), (2, "bob"), (3, "alice")] {
                let mut fields = IndexMap::new();
                fields.insert("name".to_string(), Document::String(name.into()));
                table.seed(key, Document::Map(fields)).await;
            }

            let query: Query<i64> = Query::new().with_field("name", "alice");
            let found = table.find_all_async(&query).await.unwrap();
            assert_eq!(found.len(), 2);
        }
    }
}
