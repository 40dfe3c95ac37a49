//! Deterministic feature-hashing embedder.
//!
//! [`HashingEmbedder`] maps each lowercased word to a signed bucket chosen by
//! its blake3 hash. Texts sharing words land close together under cosine
//! similarity, with no model download and fully reproducible output. It's
//! useful for:
//! - Offline use and tests
//! - Development builds without the `candle` feature
//! - Reproducible demos

use async_trait::async_trait;
use dimensia_core::{EmbedError, Embedder, EmbeddingConfig, EmbeddingOutput};
use tracing::debug;

/// Default embedding dimension.
pub const DEFAULT_DIMENSION: usize = 384;

/// Maximum tokens considered per input.
const MAX_TOKENS: usize = 512;

/// Feature-hashing embedder.
///
/// # Example
///
/// ```rust
/// use dimensia_embed::HashingEmbedder;
/// use dimensia_core::{Embedder, EmbeddingConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let embedder = HashingEmbedder::new();
/// let config = EmbeddingConfig::default();
/// let outputs = embedder.embed_text(&["Hello", "World"], &config).await?;
///
/// assert_eq!(outputs.len(), 2);
/// assert_eq!(outputs[0].embedding.len(), 384);
/// # Ok(())
/// # }
/// ```
pub struct HashingEmbedder {
    dimension: usize,
    name: String,
}

impl HashingEmbedder {
    /// Create a hashing embedder with the default dimension (384).
    #[must_use]
    pub fn new() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            name: "hashing".to_string(),
        }
    }

    /// Create a hashing embedder with a custom dimension.
    #[must_use]
    pub fn with_dimension(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            dimension,
            name: format!("hashing-{dimension}"),
        }
    }

    fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .map(str::to_lowercase)
    }

    fn embed_one(&self, text: &str, normalize: bool) -> EmbeddingOutput {
        let mut embedding = vec![0.0f32; self.dimension];
        let mut token_count = 0;

        for token in Self::tokenize(text).take(MAX_TOKENS) {
            let hash = blake3::hash(token.as_bytes());
            let bytes = hash.as_bytes();
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&bytes[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
            embedding[bucket] += sign;
            token_count += 1;
        }

        if normalize {
            let norm = embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
            if norm > 0.0 {
                for v in &mut embedding {
                    *v /= norm;
                }
            }
        }

        EmbeddingOutput {
            embedding,
            token_count,
        }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn max_tokens(&self) -> usize {
        MAX_TOKENS
    }

    async fn embed_text(
        &self,
        texts: &[&str],
        config: &EmbeddingConfig,
    ) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        debug!("Hashing {} texts into {} dimensions", texts.len(), self.dimension);
        Ok(texts
            .iter()
            .map(|text| self.embed_one(text, config.normalize))
            .collect())
    }
}
