//! Embedder registry for resolving model names.

use dimensia_core::{EmbedError, Embedder};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::hashing::{HashingEmbedder, DEFAULT_DIMENSION};

/// Registry of embedding models, keyed by the name callers pass to
/// `set_embedding_model`.
pub struct EmbedderRegistry {
    /// Named embedders
    embedders: HashMap<String, Arc<dyn Embedder>>,
    /// Where downloaded model files are kept
    model_dir: Option<PathBuf>,
}

impl EmbedderRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            embedders: HashMap::new(),
            model_dir: None,
        }
    }

    /// Create a registry with the built-in hashing embedders.
    ///
    /// `hashing` resolves to a 384-dimension embedder; `hashing-<dim>` names
    /// resolve on demand.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("hashing", HashingEmbedder::new());
        registry.register(
            &format!("hashing-{DEFAULT_DIMENSION}"),
            HashingEmbedder::with_dimension(DEFAULT_DIMENSION),
        );
        registry
    }

    /// Set the directory used for downloaded models.
    #[must_use]
    pub fn with_model_dir(mut self, dir: PathBuf) -> Self {
        self.model_dir = Some(dir);
        self
    }

    /// Register an embedder under a name.
    pub fn register<E: Embedder + 'static>(&mut self, name: &str, embedder: E) {
        self.embedders.insert(name.to_string(), Arc::new(embedder));
    }

    /// Names of registered embedders, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.embedders.keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolve a model name to an embedder.
    pub async fn resolve(&self, name: &str) -> Result<Arc<dyn Embedder>, EmbedError> {
        let name = name.trim();
        if let Some(embedder) = self.embedders.get(name) {
            debug!("Resolved registered embedder {}", name);
            return Ok(Arc::clone(embedder));
        }

        if let Some(dim) = name.strip_prefix("hashing-") {
            let dimension: usize = dim
                .parse()
                .map_err(|_| EmbedError::UnknownModel(name.to_string()))?;
            if dimension == 0 {
                return Err(EmbedError::UnknownModel(name.to_string()));
            }
            return Ok(Arc::new(HashingEmbedder::with_dimension(dimension)));
        }

        self.load_hub_model(name).await
    }

    #[cfg(feature = "candle")]
    async fn load_hub_model(&self, name: &str) -> Result<Arc<dyn Embedder>, EmbedError> {
        let embedder = crate::candle::CandleEmbedder::new(name, self.model_dir.clone());
        embedder.init().await?;
        info!("Loaded embedding model {} ({} dims)", name, embedder.dimension());
        Ok(Arc::new(embedder))
    }

    #[cfg(not(feature = "candle"))]
    async fn load_hub_model(&self, name: &str) -> Result<Arc<dyn Embedder>, EmbedError> {
        info!(
            "Model {} is not registered and the candle feature is disabled (model dir: {:?})",
            name, self.model_dir
        );
        Err(EmbedError::UnknownModel(name.to_string()))
    }
}

impl Default for EmbedderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
