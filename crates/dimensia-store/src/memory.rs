//! In-memory collection store.
//!
//! [`MemoryStore`] keeps every collection in memory and ranks documents by
//! brute force. It's useful for:
//! - Tests that don't need persistence
//! - Short-lived sessions
//! - The in-memory half of [`JsonStore`](crate::JsonStore)

use async_trait::async_trait;
use dimensia_core::{
    CollectionStats, CollectionStore, Document, DocumentId, PendingDocument, SearchQuery,
    SearchResult, StoreError,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::collection::CollectionData;

/// In-memory collection store.
///
/// # Example
///
/// ```rust
/// use dimensia_store::MemoryStore;
/// use dimensia_core::CollectionStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// store.init().await?;
/// store.create_collection("notes", None).await?;
///
/// let stats = store.stats("notes").await?;
/// assert_eq!(stats.document_count, 0);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<BTreeMap<String, CollectionData>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole state, used when loading from disk.
    pub(crate) async fn load(&self, collections: Vec<CollectionData>) {
        let mut map = self.collections.write().await;
        map.clear();
        for data in collections {
            map.insert(data.name.clone(), data);
        }
    }

    /// Copy of one collection's state.
    pub(crate) async fn snapshot(&self, name: &str) -> Result<CollectionData, StoreError> {
        self.collections
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))
    }

    /// Insert or replace one collection's state.
    pub(crate) async fn put(&self, data: CollectionData) {
        self.collections.write().await.insert(data.name.clone(), data);
    }

    pub(crate) async fn contains(&self, name: &str) -> bool {
        self.collections.read().await.contains_key(name)
    }

    async fn with_collection<T>(
        &self,
        name: &str,
        f: impl FnOnce(&CollectionData) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let collections = self.collections.read().await;
        let data = collections
            .get(name)
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))?;
        f(data)
    }
}

#[async_trait]
impl CollectionStore for MemoryStore {
    async fn init(&self) -> Result<(), StoreError> {
        debug!("MemoryStore initialized");
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.collections.read().await.keys().cloned().collect())
    }

    async fn create_collection(
        &self,
        name: &str,
        vector_size: Option<usize>,
    ) -> Result<(), StoreError> {
        let data = CollectionData::new(name, vector_size)?;
        let mut collections = self.collections.write().await;
        if collections.contains_key(name) {
            return Err(StoreError::CollectionExists(name.to_string()));
        }
        collections.insert(name.to_string(), data);
        debug!("Created collection {} (vector size: {:?})", name, vector_size);
        Ok(())
    }

    async fn insert_documents(
        &self,
        collection: &str,
        documents: Vec<PendingDocument>,
    ) -> Result<Vec<DocumentId>, StoreError> {
        let mut collections = self.collections.write().await;
        let data = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        let ids = data.insert(documents)?;
        debug!("Inserted {} documents into {}", ids.len(), collection);
        Ok(ids)
    }

    async fn search(
        &self,
        collection: &str,
        query: SearchQuery,
    ) -> Result<Vec<SearchResult>, StoreError> {
        self.with_collection(collection, |data| data.search(&query))
            .await
    }

    async fn get_document(
        &self,
        collection: &str,
        id: DocumentId,
    ) -> Result<Option<Document>, StoreError> {
        self.with_collection(collection, |data| Ok(data.get(id)))
            .await
    }

    async fn get_all_documents(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.with_collection(collection, |data| Ok(data.documents()))
            .await
    }

    async fn stats(&self, collection: &str) -> Result<CollectionStats, StoreError> {
        self.with_collection(collection, |data| Ok(data.stats()))
            .await
    }
}
