//! The `Dimensia` client handle.

use dimensia_core::{
    Backend, CollectionInfo, CollectionStore, CollectionStructure, DistanceMetric, Document,
    DocumentId, DocumentListing, NewDocument, Result, SearchResult,
};
use dimensia_embed::EmbedderRegistry;
use dimensia_store::JsonStore;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::backend::LocalBackend;
use crate::config::DimensiaConfig;

/// Client for a Dimensia vector database.
///
/// Every method is a single call on the underlying [`Backend`]; errors are
/// returned unchanged.
///
/// # Example
///
/// ```rust,no_run
/// use dimensia::{Dimensia, DistanceMetric, NewDocument};
///
/// # async fn example() -> dimensia::Result<()> {
/// let db = Dimensia::open("dimensia_db").await?;
/// db.set_embedding_model("hashing").await?;
///
/// if !db.get_collections().await?.contains("research_articles") {
///     db.create_collection("research_articles").await?;
/// }
/// db.add_documents(
///     "research_articles",
///     vec![NewDocument::new("Transformers outperform recurrent networks in NLP.")],
/// )
/// .await?;
///
/// let results = db
///     .search("transformers in NLP", "research_articles", 3, DistanceMetric::Cosine)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Dimensia {
    backend: Arc<dyn Backend>,
}

impl Dimensia {
    /// Open or create a database rooted at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tokio::fs::create_dir_all(path).await?;

        let store = JsonStore::new(path);
        store.init().await?;
        info!("Opened database at {:?}", path);

        Ok(Self::with_backend(Arc::new(LocalBackend::new(Arc::new(store)))))
    }

    /// Open the database described by `config`, selecting its embedding model.
    pub async fn open_with_config(config: &DimensiaConfig) -> Result<Self> {
        let path = &config.storage.db_path;
        tokio::fs::create_dir_all(path).await?;

        let store = JsonStore::new(path);
        store.init().await?;
        info!("Opened database at {:?}", path);

        let mut registry = EmbedderRegistry::with_defaults();
        if let Some(dir) = config.model_dir() {
            registry = registry.with_model_dir(dir);
        }

        let backend = LocalBackend::new(Arc::new(store))
            .with_registry(registry)
            .with_embedding_config(config.embedding.embedding_config())
            .with_cache_capacity(config.embedding.cache_capacity);
        let db = Self::with_backend(Arc::new(backend));

        if let Some(model) = &config.embedding.model {
            db.set_embedding_model(model).await?;
        }

        Ok(db)
    }

    /// Wrap an existing backend.
    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Select the embedding model for later insertions and queries.
    pub async fn set_embedding_model(&self, name: &str) -> Result<()> {
        self.backend.set_embedding_model(name).await
    }

    /// Currently selected embedding model.
    pub async fn embedding_model(&self) -> Option<String> {
        self.backend.embedding_model().await
    }

    /// Names of all collections.
    pub async fn get_collections(&self) -> Result<BTreeSet<String>> {
        Ok(self.backend.list_collections().await?.into_iter().collect())
    }

    /// Create an empty collection.
    pub async fn create_collection(&self, name: &str) -> Result<()> {
        self.backend.create_collection(name).await
    }

    /// Embed and insert documents, returning their ids in input order.
    pub async fn add_documents(
        &self,
        collection: &str,
        documents: Vec<NewDocument>,
    ) -> Result<Vec<DocumentId>> {
        debug!("Adding {} documents to {}", documents.len(), collection);
        self.backend.add_documents(collection, documents).await
    }

    pub async fn get_collection_info(&self, collection: &str) -> Result<CollectionInfo> {
        self.backend.collection_info(collection).await
    }

    pub async fn get_structure(&self, collection: &str) -> Result<CollectionStructure> {
        self.backend.structure(collection).await
    }

    /// Embedding dimensionality of a collection.
    pub async fn get_vector_size(&self, collection: &str) -> Result<usize> {
        self.backend.vector_size(collection).await
    }

    /// At most `top_k` documents most similar to `query`, best first.
    pub async fn search(
        &self,
        query: &str,
        collection: &str,
        top_k: usize,
        metric: DistanceMetric,
    ) -> Result<Vec<SearchResult>> {
        debug!("Searching {} (top_k={}, metric={})", collection, top_k, metric);
        self.backend.search(query, collection, top_k, metric).await
    }

    /// Point lookup; `None` when no document has this id.
    pub async fn get_document(&self, collection: &str, id: DocumentId) -> Result<Option<Document>> {
        self.backend.get_document(collection, id).await
    }

    /// Every document in the collection, ordered by id.
    pub async fn get_all_docs(&self, collection: &str) -> Result<DocumentListing> {
        self.backend.get_all_docs(collection).await
    }
}
