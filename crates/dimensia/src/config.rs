//! Configuration handling for Dimensia.
//!
//! Configuration is read from `config.toml` in the platform config directory
//! (`~/.config/dimensia/config.toml` on Linux). Every field has a default, so a
//! missing file or a partial file is fine.

use dimensia_core::{DistanceMetric, EmbeddingConfig, Error, Result};
use dimensia_embed::cache::DEFAULT_CACHE_SIZE;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.toml";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DimensiaConfig {
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Embedding configuration
    #[serde(default)]
    pub embedding: EmbeddingSettings,

    /// Search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the database lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database root directory
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_db_path() -> PathBuf {
    data_dir().map_or_else(|| PathBuf::from("dimensia_db"), |dir| dir.join("db"))
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Embedding-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Model selected when the database is opened
    #[serde(default = "default_embedding_model")]
    pub model: Option<String>,

    /// Batch size for embedding
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// L2-normalize embeddings
    #[serde(default = "default_normalize")]
    pub normalize: bool,

    /// Entries kept in the embedding cache
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_embedding_model() -> Option<String> {
    Some("hashing".to_string())
}

fn default_batch_size() -> usize {
    32
}

fn default_normalize() -> bool {
    true
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_SIZE
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            batch_size: default_batch_size(),
            normalize: default_normalize(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl EmbeddingSettings {
    /// Per-call embedding parameters.
    pub fn embedding_config(&self) -> EmbeddingConfig {
        EmbeddingConfig {
            normalize: self.normalize,
            batch_size: self.batch_size.max(1),
        }
    }
}

/// Search defaults used by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default result limit
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Default similarity metric
    #[serde(default)]
    pub metric: DistanceMetric,
}

fn default_top_k() -> usize {
    5
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            metric: DistanceMetric::default(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl DimensiaConfig {
    /// Load from the default config path, falling back to defaults when the
    /// file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load from `path`, or the default config path when `None`.
    pub fn load_from(path: Option<PathBuf>) -> Result<Self> {
        match path.or_else(Self::config_path) {
            Some(path) if path.exists() => Self::read(&path),
            _ => Ok(Self::default()),
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Path of the default config file.
    pub fn config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join(CONFIG_FILE))
    }

    /// Directory for downloaded embedding models.
    pub fn model_dir(&self) -> Option<PathBuf> {
        cache_dir().map(|dir| dir.join("models"))
    }

    /// A commented sample configuration file.
    pub fn sample_toml() -> &'static str {
        r#"# Dimensia configuration

[storage]
# Database root directory
# db_path = "/path/to/dimensia_db"

[embedding]
# Model selected on open: "hashing", "hashing-<dim>", or a Hugging Face id
# such as "sentence-transformers/paraphrase-MiniLM-L6-v2" (candle feature)
model = "hashing"
batch_size = 32
normalize = true
cache_capacity = 10000

[search]
default_top_k = 5
# cosine, l2 or dot
metric = "cosine"

[logging]
level = "info"
"#
    }
}

/// Get the XDG data directory for Dimensia.
pub fn data_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("DIMENSIA_DATA_DIR") {
        return Some(PathBuf::from(dir));
    }

    ProjectDirs::from("", "", "dimensia").map(|dirs| dirs.data_dir().to_path_buf())
}

/// Get the XDG config directory for Dimensia.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("DIMENSIA_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }

    ProjectDirs::from("", "", "dimensia").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the XDG cache directory for Dimensia.
pub fn cache_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "dimensia").map(|dirs| dirs.cache_dir().to_path_buf())
}
