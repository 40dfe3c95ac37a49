//! Error types for Dimensia.

use thiserror::Error;

/// Main error type for Dimensia operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Embedding generation failed
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbedError),

    /// Collection store operation failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Caller supplied an unusable argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Embedding errors.
#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("model loading failed: {0}")]
    ModelLoad(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("no embedding model set")]
    NotConfigured,

    #[error("unknown embedding model: {0}")]
    UnknownModel(String),
}

/// Collection store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store initialization failed: {0}")]
    Init(String),

    #[error("insert failed: {0}")]
    Insert(String),

    #[error("persist failed: {0}")]
    Persist(String),

    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("collection already exists: {0}")]
    CollectionExists(String),

    #[error("invalid collection name: {0:?}")]
    InvalidName(String),

    #[error("vector size mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("vector size not yet known for collection {0}")]
    VectorSizeUnknown(String),
}

/// Result type alias for Dimensia operations.
pub type Result<T> = std::result::Result<T, Error>;
