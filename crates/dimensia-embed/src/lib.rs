//! # dimensia-embed
//!
//! Embedding generation for Dimensia.
//!
//! ## Cargo Features
//!
//! - `candle`: Enables the Candle ML stack so any BERT-family Hugging Face
//!   sentence-embedding model can be selected by its id
//! - Without `candle`: only the built-in hashing embedders resolve
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dimensia_embed::{EmbedderRegistry, EmbeddingCache};
//! use dimensia_core::{Embedder, EmbeddingConfig};
//!
//! let registry = EmbedderRegistry::with_defaults();
//! let embedder = registry.resolve("hashing").await?;
//! let cache = EmbeddingCache::new(embedder);
//!
//! let config = EmbeddingConfig::default();
//! let embeddings = cache.embed_text(&["Hello world", "Machine learning"], &config).await?;
//! ```
//!
//! ## Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`HashingEmbedder`] | Deterministic feature-hashing embeddings (always available) |
//! | [`EmbeddingCache`] | LRU cache for document embeddings (always available) |
//! | [`EmbedderRegistry`] | Resolves model names to embedders (always available) |
//! | `CandleEmbedder` | BERT sentence embeddings (requires `candle` feature) |

pub mod cache;
#[cfg(feature = "candle")]
pub mod candle;
pub mod hashing;
pub mod registry;

pub use cache::{CacheStats, EmbeddingCache};
#[cfg(feature = "candle")]
pub use candle::CandleEmbedder;
pub use hashing::HashingEmbedder;
pub use registry::EmbedderRegistry;
