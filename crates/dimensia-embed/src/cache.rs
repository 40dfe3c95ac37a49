//! Embedding cache for avoiding redundant computations.
//!
//! Document embeddings are cached by the blake3 hash of their text, with
//! least-recently-used eviction. The cache is itself an [`Embedder`], so it
//! can stand in wherever the wrapped embedder is expected.

use async_trait::async_trait;
use dimensia_core::{EmbedError, Embedder, EmbeddingConfig, EmbeddingOutput};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Maximum number of entries in the cache.
pub const DEFAULT_CACHE_SIZE: usize = 10_000;

/// A cached embedding and when it was last used.
#[derive(Clone)]
struct CacheEntry {
    output: EmbeddingOutput,
    last_access: u64,
}

/// Cache statistics.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Texts served from the cache
    pub hits: u64,
    /// Texts sent to the wrapped embedder
    pub misses: u64,
    /// Entries dropped to make room
    pub evictions: u64,
}

/// Everything guarded by the cache lock.
#[derive(Default)]
struct CacheState {
    entries: HashMap<blake3::Hash, CacheEntry>,
    /// Monotonic access clock for LRU ordering
    clock: u64,
    stats: CacheStats,
}

impl CacheState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn lookup(&mut self, key: &blake3::Hash) -> Option<EmbeddingOutput> {
        let now = self.tick();
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.last_access = now;
                self.stats.hits += 1;
                Some(entry.output.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Drop least recently used entries so `incoming` more fit under
    /// `capacity`. Evicts at least a tenth of the capacity at a time.
    fn make_room(&mut self, incoming: usize, capacity: usize) {
        let needed = (self.entries.len() + incoming).saturating_sub(capacity);
        if needed == 0 {
            return;
        }

        let evict = needed.max(capacity / 10).min(self.entries.len());
        let mut by_age: Vec<(u64, blake3::Hash)> = self
            .entries
            .iter()
            .map(|(key, entry)| (entry.last_access, *key))
            .collect();
        by_age.sort_unstable_by_key(|(tick, _)| *tick);

        for (_, key) in by_age.into_iter().take(evict) {
            self.entries.remove(&key);
        }
        self.stats.evictions += evict as u64;
    }
}

/// LRU cache in front of an embedder.
pub struct EmbeddingCache {
    embedder: Arc<dyn Embedder>,
    capacity: usize,
    state: Mutex<CacheState>,
}

impl EmbeddingCache {
    /// Wrap `embedder` with a cache of [`DEFAULT_CACHE_SIZE`] entries.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self::with_capacity(embedder, DEFAULT_CACHE_SIZE)
    }

    pub fn with_capacity(embedder: Arc<dyn Embedder>, capacity: usize) -> Self {
        Self {
            embedder,
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    pub async fn stats(&self) -> CacheStats {
        self.state.lock().await.stats.clone()
    }

    /// Number of cached embeddings.
    pub async fn size(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every cached embedding. Statistics are kept.
    pub async fn clear(&self) {
        self.state.lock().await.entries.clear();
    }
}

#[async_trait]
impl Embedder for EmbeddingCache {
    fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    fn max_tokens(&self) -> usize {
        self.embedder.max_tokens()
    }

    async fn embed_text(
        &self,
        texts: &[&str],
        config: &EmbeddingConfig,
    ) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        let keys: Vec<blake3::Hash> = texts.iter().map(|t| blake3::hash(t.as_bytes())).collect();

        let mut results: Vec<Option<EmbeddingOutput>> = {
            let mut state = self.state.lock().await;
            keys.iter().map(|key| state.lookup(key)).collect()
        };

        let missing: Vec<usize> = (0..texts.len()).filter(|&i| results[i].is_none()).collect();
        if missing.is_empty() {
            return Ok(results.into_iter().flatten().collect());
        }

        debug!("Embedding {} uncached of {} texts", missing.len(), texts.len());
        let batch: Vec<&str> = missing.iter().map(|&i| texts[i]).collect();
        let fresh = self.embedder.embed_text(&batch, config).await?;
        if fresh.len() != batch.len() {
            return Err(EmbedError::Inference(format!(
                "embedder returned {} vectors for {} texts",
                fresh.len(),
                batch.len()
            )));
        }

        {
            let mut state = self.state.lock().await;
            let storable = missing.len().min(self.capacity);
            state.make_room(storable, self.capacity);
            for (&i, output) in missing.iter().zip(&fresh).take(storable) {
                let last_access = state.tick();
                state.entries.insert(
                    keys[i],
                    CacheEntry {
                        output: output.clone(),
                        last_access,
                    },
                );
            }
        }

        for (i, output) in missing.into_iter().zip(fresh) {
            results[i] = Some(output);
        }
        Ok(results.into_iter().flatten().collect())
    }

    /// Queries are one-off and bypass the cache.
    async fn embed_query(
        &self,
        query: &str,
        config: &EmbeddingConfig,
    ) -> Result<EmbeddingOutput, EmbedError> {
        self.embedder.embed_query(query, config).await
    }
}
