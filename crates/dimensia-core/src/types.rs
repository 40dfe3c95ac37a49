//! Core types for Dimensia.
//!
//! ## Documents
//! - [`NewDocument`]: Caller-supplied content and metadata
//! - [`Document`]: A stored document as returned to callers
//! - [`StoredDocument`]: A document together with its embedding
//! - [`PendingDocument`]: An embedded document waiting for an id
//!
//! ## Collections
//! - [`CollectionStats`]: Summary of one collection
//! - [`CollectionInfo`] / [`CollectionStructure`]: Named views over that summary
//!
//! ## Embeddings
//! - [`EmbeddingConfig`]: Configuration for embedding generation
//! - [`EmbeddingOutput`]: Result of embedding a text
//!
//! ## Search
//! - [`SearchQuery`]: Parameters for a vector search
//! - [`SearchResult`]: A matching document with similarity score
//! - [`DistanceMetric`]: Vector similarity calculation method

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Backend-assigned document identifier, unique within a collection.
pub type DocumentId = u64;

/// Arbitrary key/value metadata attached to a document.
pub type Metadata = BTreeMap<String, Value>;

// ============================================================================
// Documents
// ============================================================================

/// A document submitted for insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDocument {
    /// Text content to embed
    pub content: String,
    /// Caller metadata
    #[serde(default)]
    pub metadata: Metadata,
}

impl NewDocument {
    /// Create a document with empty metadata.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A document as stored in a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document identifier
    pub id: DocumentId,
    /// Text content
    pub content: String,
    /// Caller metadata
    #[serde(default)]
    pub metadata: Metadata,
}

/// A document with its embedding, as kept by a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: DocumentId,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
    /// Embedding vector
    pub embedding: Vec<f32>,
    /// Model that produced the embedding
    pub embedding_model: Option<String>,
    /// Insertion time
    pub created_at: DateTime<Utc>,
}

impl StoredDocument {
    /// Drop the embedding and return the caller-facing document.
    pub fn to_document(&self) -> Document {
        Document {
            id: self.id,
            content: self.content.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// An embedded document handed to a store, which assigns its id.
#[derive(Debug, Clone)]
pub struct PendingDocument {
    pub content: String,
    pub metadata: Metadata,
    pub embedding: Vec<f32>,
    pub embedding_model: Option<String>,
}

/// Every document of a collection, ordered by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentListing {
    pub documents: Vec<Document>,
}

// ============================================================================
// Collections
// ============================================================================

/// Summary statistics for one collection.
///
/// [`CollectionInfo`] and [`CollectionStructure`] are both derived from this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionStats {
    /// Collection name
    pub name: String,
    /// Number of stored documents
    pub document_count: u64,
    /// Embedding dimensionality, once known
    pub vector_size: Option<usize>,
    /// Model recorded on the collection
    pub embedding_model: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last insertion time
    pub updated_at: Option<DateTime<Utc>>,
    /// Smallest document id
    pub first_id: Option<DocumentId>,
    /// Largest document id
    pub last_id: Option<DocumentId>,
    /// Metadata keys used by any document
    pub metadata_keys: BTreeSet<String>,
}

impl CollectionStats {
    /// The descriptive view: identity, size and provenance.
    pub fn info(&self) -> CollectionInfo {
        CollectionInfo {
            name: self.name.clone(),
            document_count: self.document_count,
            vector_size: self.vector_size,
            embedding_model: self.embedding_model.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// The layout view: counts, id range and metadata schema.
    pub fn structure(&self) -> CollectionStructure {
        CollectionStructure {
            document_count: self.document_count,
            vector_size: self.vector_size,
            first_id: self.first_id,
            last_id: self.last_id,
            metadata_keys: self.metadata_keys.clone(),
        }
    }
}

/// Collection information returned by `get_collection_info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub document_count: u64,
    pub vector_size: Option<usize>,
    pub embedding_model: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Collection structure returned by `get_structure`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionStructure {
    pub document_count: u64,
    pub vector_size: Option<usize>,
    pub first_id: Option<DocumentId>,
    pub last_id: Option<DocumentId>,
    pub metadata_keys: BTreeSet<String>,
}

// ============================================================================
// Embedding
// ============================================================================

/// Configuration for embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Normalize embeddings to unit length
    pub normalize: bool,
    /// Batch size for processing
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            normalize: true,
            batch_size: 32,
        }
    }
}

/// Output from embedding.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    /// The embedding vector
    pub embedding: Vec<f32>,
    /// Number of tokens in input
    pub token_count: usize,
}

// ============================================================================
// Search
// ============================================================================

/// A search query against one collection.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Query embedding
    pub embedding: Vec<f32>,
    /// Maximum results to return
    pub top_k: usize,
    /// Similarity metric
    pub metric: DistanceMetric,
}

/// Similarity metric for vector search. Higher scores rank first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Cosine similarity
    #[default]
    Cosine,
    /// Euclidean distance, scored as `1 / (1 + d)`
    #[serde(alias = "euclidean")]
    L2,
    /// Inner product
    #[serde(alias = "dot_product", alias = "ip")]
    Dot,
}

impl DistanceMetric {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::L2 => "l2",
            Self::Dot => "dot",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "l2" | "euclidean" => Ok(Self::L2),
            "dot" | "dot_product" | "ip" => Ok(Self::Dot),
            other => Err(Error::InvalidArgument(format!("unknown metric: {other}"))),
        }
    }
}

/// A search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Similarity score
    pub score: f32,
    /// Matching document
    pub document: Document,
}
