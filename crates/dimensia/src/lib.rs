//! # Dimensia
//!
//! A small embedded vector database with a thin client handle.
//!
//! [`Dimensia`] forwards every call to a [`Backend`]. The default backend,
//! [`LocalBackend`], embeds text in-process (see `dimensia-embed`) and keeps
//! collections in JSON snapshots on disk (see `dimensia-store`).
//!
//! ```rust,no_run
//! use dimensia::{Dimensia, DistanceMetric, NewDocument};
//!
//! # async fn example() -> dimensia::Result<()> {
//! let db = Dimensia::open("dimensia_db").await?;
//! db.set_embedding_model("hashing").await?;
//! db.create_collection("notes").await?;
//! db.add_documents("notes", vec![NewDocument::new("vector search in Rust")])
//!     .await?;
//!
//! for result in db.search("rust search", "notes", 3, DistanceMetric::Cosine).await? {
//!     println!("{:.3} {}", result.score, result.document.content);
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod client;
pub mod config;

pub use backend::LocalBackend;
pub use client::Dimensia;
pub use config::DimensiaConfig;

pub use dimensia_core::{
    Backend, CollectionInfo, CollectionStructure, DistanceMetric, Document, DocumentId,
    DocumentListing, EmbedError, Error, Metadata, NewDocument, Result, SearchResult, StoreError,
};
