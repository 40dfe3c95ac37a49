//! Core traits for Dimensia components.
//!
//! - [`Embedder`]: Generate vector embeddings
//! - [`CollectionStore`]: Store documents and rank them against a query vector
//! - [`Backend`]: The full operation set the client facade forwards to
//!
//! These traits enable a pluggable architecture where different implementations
//! can be swapped without changing the rest of the system.

use async_trait::async_trait;

use crate::error::{EmbedError, Result, StoreError};
use crate::types::{
    CollectionInfo, CollectionStats, CollectionStructure, DistanceMetric, Document, DocumentId,
    DocumentListing, EmbeddingConfig, EmbeddingOutput, NewDocument, PendingDocument, SearchQuery,
    SearchResult,
};

// ============================================================================
// Embedding
// ============================================================================

/// Trait for generating embeddings.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model name/identifier.
    fn model_name(&self) -> &str;

    /// Embedding dimension.
    fn dimension(&self) -> usize;

    /// Maximum tokens per input.
    fn max_tokens(&self) -> usize;

    /// Embed text content.
    async fn embed_text(
        &self,
        texts: &[&str],
        config: &EmbeddingConfig,
    ) -> std::result::Result<Vec<EmbeddingOutput>, EmbedError>;

    /// Embed a query (may use different instruction).
    async fn embed_query(
        &self,
        query: &str,
        config: &EmbeddingConfig,
    ) -> std::result::Result<EmbeddingOutput, EmbedError> {
        let results = self.embed_text(&[query], config).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::Inference("empty embedding result".to_string()))
    }
}

// ============================================================================
// Collection Storage
// ============================================================================

/// Trait for collection storage and search.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Initialize the store.
    async fn init(&self) -> std::result::Result<(), StoreError>;

    /// Names of all collections, sorted.
    async fn list_collections(&self) -> std::result::Result<Vec<String>, StoreError>;

    /// Create an empty collection, optionally fixing its vector size.
    async fn create_collection(
        &self,
        name: &str,
        vector_size: Option<usize>,
    ) -> std::result::Result<(), StoreError>;

    /// Insert documents, returning their ids in input order.
    async fn insert_documents(
        &self,
        collection: &str,
        documents: Vec<PendingDocument>,
    ) -> std::result::Result<Vec<DocumentId>, StoreError>;

    /// Rank documents against a query vector.
    async fn search(
        &self,
        collection: &str,
        query: SearchQuery,
    ) -> std::result::Result<Vec<SearchResult>, StoreError>;

    /// Point lookup by id.
    async fn get_document(
        &self,
        collection: &str,
        id: DocumentId,
    ) -> std::result::Result<Option<Document>, StoreError>;

    /// All documents ordered by id.
    async fn get_all_documents(
        &self,
        collection: &str,
    ) -> std::result::Result<Vec<Document>, StoreError>;

    /// Collection statistics.
    async fn stats(&self, collection: &str) -> std::result::Result<CollectionStats, StoreError>;
}

// ============================================================================
// Backend
// ============================================================================

/// The operation set behind the `Dimensia` client facade.
///
/// Every facade call maps to exactly one method here, so a facade can be
/// driven by an embedded database, a remote service, or a canned test double.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Select the embedding model used for later insertions and queries.
    async fn set_embedding_model(&self, name: &str) -> Result<()>;

    /// Currently selected embedding model, if any.
    async fn embedding_model(&self) -> Option<String>;

    async fn list_collections(&self) -> Result<Vec<String>>;

    async fn create_collection(&self, name: &str) -> Result<()>;

    async fn add_documents(
        &self,
        collection: &str,
        documents: Vec<NewDocument>,
    ) -> Result<Vec<DocumentId>>;

    async fn collection_info(&self, collection: &str) -> Result<CollectionInfo>;

    async fn structure(&self, collection: &str) -> Result<CollectionStructure>;

    async fn vector_size(&self, collection: &str) -> Result<usize>;

    async fn search(
        &self,
        query: &str,
        collection: &str,
        top_k: usize,
        metric: DistanceMetric,
    ) -> Result<Vec<SearchResult>>;

    async fn get_document(&self, collection: &str, id: DocumentId) -> Result<Option<Document>>;

    async fn get_all_docs(&self, collection: &str) -> Result<DocumentListing>;
}
