//! # dimensia-core
//!
//! Core types and traits for Dimensia, a small embedded vector database
//! client.
//!
//! This crate provides the foundational abstractions used throughout Dimensia:
//!
//! - **Embedding Generation**: [`Embedder`] trait for converting text to vector embeddings
//! - **Collection Storage**: [`CollectionStore`] trait for storing and ranking documents
//! - **Client Backend**: [`Backend`] trait, the operation set the client facade forwards to
//!
//! ## Architecture
//!
//! ```text
//! Dimensia (facade) → Backend → Embedder
//!                             → CollectionStore → SearchResult
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`NewDocument`] | Content and metadata submitted by a caller |
//! | [`Document`] | A stored document with its assigned id |
//! | [`SearchResult`] | A matching document with similarity score |
//! | [`CollectionInfo`] | Descriptive summary of a collection |
//! | [`CollectionStructure`] | Layout summary of a collection |
//! | [`DistanceMetric`] | Cosine, L2 or dot-product ranking |
//!
//! ## Related Crates
//!
//! - `dimensia-embed`: Embedder implementations, cache and model registry
//! - `dimensia-store`: In-memory and JSON-snapshot collection stores
//! - `dimensia`: The client facade, local backend and CLI

pub mod error;
pub mod traits;
pub mod types;

pub use error::{EmbedError, Error, Result, StoreError};
pub use traits::*;
pub use types::*;
