//! Collection storage for Dimensia.
//!
//! This crate implements the [`CollectionStore`](dimensia_core::CollectionStore)
//! trait twice:
//!
//! - [`MemoryStore`]: everything in memory, nothing survives the process
//! - [`JsonStore`]: the same in-memory engine with one JSON snapshot per
//!   collection under `<db_path>/collections/`
//!
//! Search is exact brute force over every stored vector, see [`distance`].
//!
//! # Example
//!
//! ```rust,no_run
//! use dimensia_store::JsonStore;
//! use dimensia_core::CollectionStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = JsonStore::new("./dimensia_data");
//! store.init().await?;
//! store.create_collection("research_articles", Some(384)).await?;
//! println!("{:?}", store.list_collections().await?);
//! # Ok(())
//! # }
//! ```

pub mod collection;
pub mod distance;
pub mod json;
pub mod memory;

pub use collection::{validate_collection_name, CollectionData, MAX_NAME_LEN};
pub use json::JsonStore;
pub use memory::MemoryStore;
