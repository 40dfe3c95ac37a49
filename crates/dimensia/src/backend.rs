//! Embedded backend: embeds text locally and ranks with a [`CollectionStore`].

use async_trait::async_trait;
use dimensia_core::{
    Backend, CollectionInfo, CollectionStats, CollectionStore, CollectionStructure,
    DistanceMetric, Document, DocumentId, DocumentListing, EmbedError, Embedder, EmbeddingConfig,
    NewDocument, PendingDocument, Result, SearchQuery, SearchResult, StoreError,
};
use dimensia_embed::cache::{CacheStats, EmbeddingCache, DEFAULT_CACHE_SIZE};
use dimensia_embed::EmbedderRegistry;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// The selected model, under the name it was selected by.
#[derive(Clone)]
struct SelectedModel {
    name: String,
    cache: Arc<EmbeddingCache>,
}

/// Backend that runs the embedding model in-process.
pub struct LocalBackend {
    registry: EmbedderRegistry,
    store: Arc<dyn CollectionStore>,
    embed_config: EmbeddingConfig,
    cache_capacity: usize,
    selected: RwLock<Option<SelectedModel>>,
}

impl LocalBackend {
    /// Create a backend over `store` with the default model registry.
    pub fn new(store: Arc<dyn CollectionStore>) -> Self {
        Self {
            registry: EmbedderRegistry::with_defaults(),
            store,
            embed_config: EmbeddingConfig::default(),
            cache_capacity: DEFAULT_CACHE_SIZE,
            selected: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: EmbedderRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn with_embedding_config(mut self, config: EmbeddingConfig) -> Self {
        self.embed_config = config;
        self
    }

    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity.max(1);
        self
    }

    /// Cache statistics for the selected model.
    pub async fn cache_stats(&self) -> Option<CacheStats> {
        let selected = self.selected.read().await.clone()?;
        Some(selected.cache.stats().await)
    }

    async fn current_model(&self) -> Result<SelectedModel> {
        self.selected
            .read()
            .await
            .clone()
            .ok_or_else(|| EmbedError::NotConfigured.into())
    }

    /// Fetch stats, warning when the collection was built with another model.
    async fn checked_stats(
        &self,
        collection: &str,
        model: &SelectedModel,
    ) -> Result<CollectionStats> {
        let stats = self.store.stats(collection).await?;
        if let Some(recorded) = &stats.embedding_model {
            if *recorded != model.name {
                warn!(
                    "Collection {} was embedded with {} but {} is selected",
                    collection, recorded, model.name
                );
            }
        }
        Ok(stats)
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn set_embedding_model(&self, name: &str) -> Result<()> {
        let name = name.trim();
        let embedder = self.registry.resolve(name).await?;
        info!(
            "Embedding model set to {} ({} dims)",
            name,
            embedder.dimension()
        );
        let cache = Arc::new(EmbeddingCache::with_capacity(embedder, self.cache_capacity));
        *self.selected.write().await = Some(SelectedModel {
            name: name.to_string(),
            cache,
        });
        Ok(())
    }

    async fn embedding_model(&self) -> Option<String> {
        self.selected.read().await.as_ref().map(|m| m.name.clone())
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        Ok(self.store.list_collections().await?)
    }

    async fn create_collection(&self, name: &str) -> Result<()> {
        let vector_size = self
            .selected
            .read()
            .await
            .as_ref()
            .map(|m| m.cache.dimension())
            .filter(|&dim| dim > 0);
        self.store.create_collection(name, vector_size).await?;
        info!("Created collection {} (vector size: {:?})", name, vector_size);
        Ok(())
    }

    async fn add_documents(
        &self,
        collection: &str,
        documents: Vec<NewDocument>,
    ) -> Result<Vec<DocumentId>> {
        if documents.is_empty() {
            self.store.stats(collection).await?;
            return Ok(Vec::new());
        }

        let model = self.current_model().await?;
        self.checked_stats(collection, &model).await?;

        let texts: Vec<&str> = documents.iter().map(|d| d.content.as_str()).collect();
        let outputs = model.cache.embed_text(&texts, &self.embed_config).await?;
        if outputs.len() != documents.len() {
            return Err(EmbedError::Inference(format!(
                "expected {} embeddings, got {}",
                documents.len(),
                outputs.len()
            ))
            .into());
        }

        let pending: Vec<PendingDocument> = documents
            .into_iter()
            .zip(outputs)
            .map(|(doc, output)| PendingDocument {
                content: doc.content,
                metadata: doc.metadata,
                embedding: output.embedding,
                embedding_model: Some(model.name.clone()),
            })
            .collect();

        let ids = self.store.insert_documents(collection, pending).await?;
        debug!("Added {} documents to {}", ids.len(), collection);
        Ok(ids)
    }

    async fn collection_info(&self, collection: &str) -> Result<CollectionInfo> {
        Ok(self.store.stats(collection).await?.info())
    }

    async fn structure(&self, collection: &str) -> Result<CollectionStructure> {
        Ok(self.store.stats(collection).await?.structure())
    }

    async fn vector_size(&self, collection: &str) -> Result<usize> {
        self.store
            .stats(collection)
            .await?
            .vector_size
            .ok_or_else(|| StoreError::VectorSizeUnknown(collection.to_string()).into())
    }

    async fn search(
        &self,
        query: &str,
        collection: &str,
        top_k: usize,
        metric: DistanceMetric,
    ) -> Result<Vec<SearchResult>> {
        let model = self.current_model().await?;
        self.checked_stats(collection, &model).await?;

        let output = model.cache.embed_query(query, &self.embed_config).await?;
        let results = self
            .store
            .search(
                collection,
                SearchQuery {
                    embedding: output.embedding,
                    top_k,
                    metric,
                },
            )
            .await?;

        debug!(
            "Search in {} returned {} results ({})",
            collection,
            results.len(),
            metric
        );
        Ok(results)
    }

    async fn get_document(&self, collection: &str, id: DocumentId) -> Result<Option<Document>> {
        Ok(self.store.get_document(collection, id).await?)
    }

    async fn get_all_docs(&self, collection: &str) -> Result<DocumentListing> {
        let documents = self.store.get_all_documents(collection).await?;
        Ok(DocumentListing { documents })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dimensia_core::Error;
    use dimensia_embed::HashingEmbedder;
    use dimensia_store::MemoryStore;

    fn create_backend() -> LocalBackend {
        LocalBackend::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_no_model_by_default() {
        let backend = create_backend();
        assert!(backend.embedding_model().await.is_none());
        assert!(backend.cache_stats().await.is_none());
    }

    #[tokio::test]
    async fn test_set_model() {
        let backend = create_backend();
        backend.set_embedding_model("hashing-16").await.unwrap();
        assert_eq!(backend.embedding_model().await.as_deref(), Some("hashing-16"));
    }

    #[tokio::test]
    async fn test_unknown_model_keeps_previous_selection() {
        let backend = create_backend();
        backend.set_embedding_model("hashing").await.unwrap();

        let err = backend.set_embedding_model("hashing-zero").await.unwrap_err();
        assert!(matches!(err, Error::Embedding(EmbedError::UnknownModel(_))));
        assert_eq!(backend.embedding_model().await.as_deref(), Some("hashing"));
    }

    #[tokio::test]
    async fn test_create_fixes_vector_size_from_model() {
        let backend = create_backend();
        backend.set_embedding_model("hashing-32").await.unwrap();
        backend.create_collection("docs").await.unwrap();
        assert_eq!(backend.vector_size("docs").await.unwrap(), 32);
    }

    #[tokio::test]
    async fn test_vector_size_unknown_without_model() {
        let backend = create_backend();
        backend.create_collection("docs").await.unwrap();
        let err = backend.vector_size("docs").await.unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::VectorSizeUnknown(_))));
    }

    #[tokio::test]
    async fn test_add_requires_model() {
        let backend = create_backend();
        backend.create_collection("docs").await.unwrap();
        let err = backend
            .add_documents("docs", vec![NewDocument::new("text")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Embedding(EmbedError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_empty_batch_checks_collection() {
        let backend = create_backend();
        assert!(matches!(
            backend.add_documents("missing", Vec::new()).await,
            Err(Error::Store(StoreError::CollectionNotFound(_)))
        ));

        backend.create_collection("docs").await.unwrap();
        assert!(backend.add_documents("docs", Vec::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_and_search() {
        let backend = create_backend();
        backend.set_embedding_model("hashing").await.unwrap();
        backend.create_collection("docs").await.unwrap();

        let ids = backend
            .add_documents(
                "docs",
                vec![
                    NewDocument::new("reinforcement learning for robots")
                        .with_metadata("topic", "rl"),
                    NewDocument::new("protein folding with deep networks"),
                ],
            )
            .await
            .unwrap();
        assert_eq!(ids, vec![1, 2]);

        let results = backend
            .search(
                "reinforcement learning for robots",
                "docs",
                1,
                DistanceMetric::Cosine,
            )
            .await
            .unwrap();
        assert_eq!(results[0].document.id, 1);
        assert!((results[0].score - 1.0).abs() < 1e-5);

        let info = backend.collection_info("docs").await.unwrap();
        assert_eq!(info.document_count, 2);
        assert_eq!(info.embedding_model.as_deref(), Some("hashing"));

        let structure = backend.structure("docs").await.unwrap();
        assert!(structure.metadata_keys.contains("topic"));
    }

    #[tokio::test]
    async fn test_documents_go_through_cache() {
        let backend = create_backend();
        backend.set_embedding_model("hashing").await.unwrap();
        backend.create_collection("docs").await.unwrap();

        backend
            .add_documents("docs", vec![NewDocument::new("same text")])
            .await
            .unwrap();
        backend
            .add_documents("docs", vec![NewDocument::new("same text")])
            .await
            .unwrap();

        let stats = backend.cache_stats().await.unwrap();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn test_model_switch_with_other_dimension_fails() {
        let backend = create_backend();
        backend.set_embedding_model("hashing-8").await.unwrap();
        backend.create_collection("docs").await.unwrap();
        backend
            .add_documents("docs", vec![NewDocument::new("first")])
            .await
            .unwrap();

        backend.set_embedding_model("hashing-16").await.unwrap();
        let err = backend
            .add_documents("docs", vec![NewDocument::new("second")])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Store(StoreError::DimensionMismatch {
                expected: 8,
                actual: 16
            })
        ));
        assert_eq!(backend.collection_info("docs").await.unwrap().document_count, 1);
    }

    #[tokio::test]
    async fn test_model_switch_with_same_dimension_proceeds() {
        let mut registry = EmbedderRegistry::with_defaults();
        registry.register("wide", HashingEmbedder::with_dimension(16));
        registry.register("narrow", HashingEmbedder::with_dimension(16));
        let backend = create_backend().with_registry(registry);

        backend.set_embedding_model("wide").await.unwrap();
        backend.create_collection("docs").await.unwrap();
        backend
            .add_documents("docs", vec![NewDocument::new("first")])
            .await
            .unwrap();

        backend.set_embedding_model("narrow").await.unwrap();
        assert_eq!(backend.embedding_model().await.as_deref(), Some("narrow"));
        let ids = backend
            .add_documents("docs", vec![NewDocument::new("second")])
            .await
            .unwrap();
        assert_eq!(ids, vec![2]);

        let info = backend.collection_info("docs").await.unwrap();
        assert_eq!(info.document_count, 2);
        assert_eq!(info.embedding_model.as_deref(), Some("wide"));
    }

    #[tokio::test]
    async fn test_model_reports_selected_name() {
        let backend = create_backend();
        backend.set_embedding_model(" hashing-384 ").await.unwrap();
        assert_eq!(backend.embedding_model().await.as_deref(), Some("hashing-384"));

        backend.create_collection("docs").await.unwrap();
        backend
            .add_documents("docs", vec![NewDocument::new("text")])
            .await
            .unwrap();
        let info = backend.collection_info("docs").await.unwrap();
        assert_eq!(info.embedding_model.as_deref(), Some("hashing-384"));
        assert_eq!(info.vector_size, Some(384));
    }

    #[tokio::test]
    async fn test_get_document_and_listing() {
        let backend = create_backend();
        backend.set_embedding_model("hashing").await.unwrap();
        backend.create_collection("docs").await.unwrap();
        backend
            .add_documents("docs", vec![NewDocument::new("a"), NewDocument::new("b")])
            .await
            .unwrap();

        assert_eq!(backend.get_document("docs", 1).await.unwrap().unwrap().content, "a");
        assert!(backend.get_document("docs", 3).await.unwrap().is_none());

        let listing = backend.get_all_docs("docs").await.unwrap();
        let ids: Vec<_> = listing.documents.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
