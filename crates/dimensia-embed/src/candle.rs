//! Sentence embeddings for BERT-family Hugging Face models using Candle.
//!
//! Works with sentence-transformers checkpoints that ship `tokenizer.json`,
//! `config.json` and `model.safetensors`, for example
//! `sentence-transformers/paraphrase-MiniLM-L6-v2` (384 dimensions).

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use dimensia_core::{EmbedError, Embedder, EmbeddingConfig, EmbeddingOutput};
use hf_hub::api::tokio::{ApiBuilder, ApiRepo};
use hf_hub::{Repo, RepoType};
use std::path::PathBuf;
use tokenizers::Tokenizer;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Longest input sequence, in tokens.
const MAX_TOKENS: usize = 512;

fn load_err(what: &str, e: impl std::fmt::Display) -> EmbedError {
    EmbedError::ModelLoad(format!("{what}: {e}"))
}

fn tensor_err(e: candle_core::Error) -> EmbedError {
    EmbedError::Inference(format!("tensor op failed: {e}"))
}

struct LoadedModel {
    model: BertModel,
    tokenizer: Tokenizer,
    hidden_size: usize,
}

/// BERT sentence embedder using Candle.
///
/// Weights are fetched through the Hugging Face hub on the first call to
/// [`CandleEmbedder::init`] (or the first embedding) and kept for the life of
/// the embedder.
pub struct CandleEmbedder {
    model_id: String,
    device: Device,
    cache_dir: Option<PathBuf>,
    loaded: OnceCell<LoadedModel>,
}

impl CandleEmbedder {
    /// Embedder for a Hugging Face model id, on CUDA when available.
    pub fn new(model_id: &str, cache_dir: Option<PathBuf>) -> Self {
        let device = Device::cuda_if_available(0).unwrap_or(Device::Cpu);
        info!("CandleEmbedder using device: {:?}", device);
        Self::with_device(model_id, cache_dir, device)
    }

    pub fn with_device(model_id: &str, cache_dir: Option<PathBuf>, device: Device) -> Self {
        Self {
            model_id: model_id.to_string(),
            device,
            cache_dir,
            loaded: OnceCell::new(),
        }
    }

    /// Download (if needed) and load the tokenizer, config and weights.
    pub async fn init(&self) -> Result<(), EmbedError> {
        self.model().await.map(|_| ())
    }

    async fn model(&self) -> Result<&LoadedModel, EmbedError> {
        self.loaded.get_or_try_init(|| self.load()).await
    }

    async fn fetch(repo: &ApiRepo, file: &str) -> Result<PathBuf, EmbedError> {
        debug!("Fetching {}", file);
        repo.get(file)
            .await
            .map_err(|e| EmbedError::ModelLoad(format!("Failed to download {file}: {e}")))
    }

    async fn load(&self) -> Result<LoadedModel, EmbedError> {
        info!("Loading embedding model {}", self.model_id);

        let mut builder = ApiBuilder::new();
        if let Some(dir) = &self.cache_dir {
            builder = builder.with_cache_dir(dir.clone());
        }
        let api = builder
            .build()
            .map_err(|e| load_err("Failed to create HF API", e))?;
        let repo = api.repo(Repo::new(self.model_id.clone(), RepoType::Model));

        let tokenizer_path = Self::fetch(&repo, "tokenizer.json").await?;
        let config_path = Self::fetch(&repo, "config.json").await?;
        let weights_path = Self::fetch(&repo, "model.safetensors").await?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| load_err("Failed to load tokenizer", e))?;

        let raw_config = std::fs::read_to_string(&config_path)
            .map_err(|e| load_err("Failed to read config.json", e))?;
        let config: Config = serde_json::from_str(&raw_config)
            .map_err(|e| load_err("Failed to parse config.json", e))?;
        let hidden_size = serde_json::from_str::<serde_json::Value>(&raw_config)
            .ok()
            .and_then(|v| v.get("hidden_size").and_then(serde_json::Value::as_u64))
            .ok_or_else(|| EmbedError::ModelLoad("config.json has no hidden_size".to_string()))?
            as usize;

        // SAFETY: the safetensors file comes from the model repository and is
        // only memory-mapped for reading.
        #[allow(unsafe_code)]
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &self.device)
                .map_err(|e| load_err("Failed to map weights", e))?
        };
        let model = BertModel::load(vb, &config)
            .map_err(|e| load_err("Failed to build BERT model", e))?;

        info!("Loaded {} ({} dims)", self.model_id, hidden_size);
        Ok(LoadedModel {
            model,
            tokenizer,
            hidden_size,
        })
    }

    /// Average token embeddings, ignoring padding.
    fn mean_pool(hidden: &Tensor, mask: &Tensor) -> Result<Tensor, EmbedError> {
        let mask = mask
            .unsqueeze(2)
            .and_then(|m| m.broadcast_as(hidden.shape()))
            .and_then(|m| m.to_dtype(DType::F32))
            .map_err(tensor_err)?;
        let summed = hidden.mul(&mask).and_then(|t| t.sum(1)).map_err(tensor_err)?;
        let counts = mask
            .sum(1)
            .and_then(|c| c.clamp(1e-9, f64::MAX))
            .map_err(tensor_err)?;
        summed.div(&counts).map_err(tensor_err)
    }

    fn l2_normalize(vectors: &Tensor) -> Result<Tensor, EmbedError> {
        let norms = vectors
            .sqr()
            .and_then(|t| t.sum_keepdim(1))
            .and_then(|t| t.sqrt())
            .and_then(|t| t.clamp(1e-12, f64::MAX))
            .map_err(tensor_err)?;
        vectors.broadcast_div(&norms).map_err(tensor_err)
    }

    async fn encode_batch(
        &self,
        texts: &[&str],
        normalize: bool,
    ) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        let loaded = self.model().await?;

        let encodings = loaded
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbedError::Inference(format!("Tokenization failed: {e}")))?;

        let width = encodings
            .iter()
            .map(|e| e.len())
            .max()
            .unwrap_or(0)
            .min(MAX_TOKENS);
        let rows = texts.len();

        let mut ids = vec![0u32; rows * width];
        let mut mask = vec![0u32; rows * width];
        let mut token_counts = Vec::with_capacity(rows);
        for (row, encoding) in encodings.iter().enumerate() {
            let tokens = &encoding.get_ids()[..encoding.len().min(width)];
            let offset = row * width;
            ids[offset..offset + tokens.len()].copy_from_slice(tokens);
            mask[offset..offset + tokens.len()].fill(1);
            token_counts.push(tokens.len());
        }

        let to_tensor =
            |data: Vec<u32>| Tensor::from_vec(data, (rows, width), &self.device).map_err(tensor_err);
        let input_ids = to_tensor(ids)?;
        let attention_mask = to_tensor(mask)?;
        let token_type_ids = to_tensor(vec![0u32; rows * width])?;

        let hidden = loaded
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))
            .map_err(|e| EmbedError::Inference(format!("Model forward failed: {e}")))?;

        let mut pooled = Self::mean_pool(&hidden, &attention_mask)?;
        if normalize {
            pooled = Self::l2_normalize(&pooled)?;
        }
        let vectors = pooled.to_vec2::<f32>().map_err(tensor_err)?;

        Ok(vectors
            .into_iter()
            .zip(token_counts)
            .map(|(embedding, token_count)| EmbeddingOutput {
                embedding,
                token_count,
            })
            .collect())
    }
}

#[async_trait]
impl Embedder for CandleEmbedder {
    fn model_name(&self) -> &str {
        &self.model_id
    }

    /// Zero until the model config has been read by [`CandleEmbedder::init`].
    fn dimension(&self) -> usize {
        self.loaded.get().map_or(0, |m| m.hidden_size)
    }

    fn max_tokens(&self) -> usize {
        MAX_TOKENS
    }

    async fn embed_text(
        &self,
        texts: &[&str],
        config: &EmbeddingConfig,
    ) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        let mut outputs = Vec::with_capacity(texts.len());
        for batch in texts.chunks(config.batch_size.max(1)) {
            debug!("Encoding batch of {}", batch.len());
            outputs.extend(self.encode_batch(batch, config.normalize).await?);
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    #[ignore] // Requires model download
    async fn test_candle_embedder() {
        let cache_dir = tempdir().unwrap();
        let embedder = CandleEmbedder::new(
            "sentence-transformers/paraphrase-MiniLM-L6-v2",
            Some(cache_dir.path().to_path_buf()),
        );

        embedder.init().await.unwrap();

        assert_eq!(embedder.dimension(), 384);

        let config = EmbeddingConfig::default();
        let results = embedder
            .embed_text(&["Hello world", "This is a test"], &config)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].embedding.len(), 384);

        let norm: f32 = results[0].embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_dimension_unknown_before_init() {
        let embedder = CandleEmbedder::with_device("some/model", None, Device::Cpu);
        assert_eq!(embedder.dimension(), 0);
        assert_eq!(embedder.model_name(), "some/model");
    }
}
