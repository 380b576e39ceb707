//! Configuration handling for docqa.
//!
//! Loaded from `<config_dir>/config.toml` (or `--config`), with every field
//! optional. `DOCQA_DATA_DIR` overrides the data directory and
//! `DOCQA_API_KEY` / `GROQ_API_KEY` supply the generation key.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use docqa_core::ChunkConfig;
use docqa_index::UploadPolicy;
use docqa_query::{GeneratorConfig, RetrieverSettings};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Embedding configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Upload validation
    #[serde(default)]
    pub upload: UploadConfig,

    /// Query configuration
    #[serde(default)]
    pub query: QueryConfig,

    /// Answer generation endpoint
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Where the vector index and model cache live
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

/// Which embedder to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Sentence-transformer model via Candle
    #[default]
    Candle,
    /// Feature hashing, no model download
    Hashing,
}

/// Embedding-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: EmbeddingBackend,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Output dimension; must match the model and the stored index
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Batch size for embedding
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Max concurrent embedding jobs
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_embedding_model() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

fn default_dimension() -> usize {
    384
}

fn default_batch_size() -> usize {
    32
}

fn default_max_concurrent() -> usize {
    4
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            model: default_embedding_model(),
            dimension: default_dimension(),
            batch_size: default_batch_size(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

/// Chunking-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Words per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Words shared by consecutive chunks
    #[serde(default = "default_overlap")]
    pub overlap: usize,

    /// Chunks of at most this many characters are dropped
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
}

fn default_chunk_size() -> usize {
    500
}

fn default_overlap() -> usize {
    50
}

fn default_min_chars() -> usize {
    50
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
            min_chars: default_min_chars(),
        }
    }
}

/// Upload validation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Maximum file size (MiB)
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
}

fn default_allowed_extensions() -> Vec<String> {
    ["pdf", "txt", "md", "docx"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_max_file_size_mb() -> u64 {
    20
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: default_allowed_extensions(),
            max_file_size_mb: default_max_file_size_mb(),
        }
    }
}

/// Query-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Default result limit
    #[serde(default = "default_k")]
    pub default_k: usize,

    /// Maximum result limit
    #[serde(default = "default_max_k")]
    pub max_k: usize,
}

fn default_k() -> usize {
    5
}

fn default_max_k() -> usize {
    50
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_k: default_k(),
            max_k: default_max_k(),
        }
    }
}

/// Chat-completion endpoint configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_generation_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Bearer token; never written back out
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

fn default_endpoint() -> String {
    docqa_query::generator::DEFAULT_ENDPOINT.to_string()
}

fn default_generation_model() -> String {
    docqa_query::generator::DEFAULT_MODEL.to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.1
}

fn default_timeout_secs() -> u64 {
    30
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field(
                "api_key",
                &self.api_key.as_deref().map(docqa_query::generator::redacted),
            )
            .finish()
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_generation_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            api_key: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive
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

impl Config {
    /// Load from the default location, falling back to defaults if absent.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load from `path`, or the default location when `None`.
    ///
    /// An explicit path must exist; the default one may be missing.
    pub fn load_from(path: Option<PathBuf>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::read(&path)?,
            None => match Self::config_path() {
                Some(path) if path.exists() => Self::read(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("DOCQA_DATA_DIR").filter(|d| !d.is_empty()) {
            self.storage.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(key) = lookup("DOCQA_API_KEY")
            .or_else(|| lookup("GROQ_API_KEY"))
            .filter(|k| !k.is_empty())
        {
            self.generation.api_key = Some(key);
        }
    }

    /// Default config file path.
    pub fn config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Effective data directory.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.storage.data_dir.clone().or_else(default_data_dir)
    }

    pub fn chunk_config(&self) -> ChunkConfig {
        ChunkConfig {
            chunk_size: self.chunking.chunk_size,
            overlap: self.chunking.overlap,
            min_chars: self.chunking.min_chars,
        }
    }

    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy::new(
            &self.upload.allowed_extensions,
            self.upload.max_file_size_mb.saturating_mul(1024 * 1024),
        )
    }

    pub fn retriever_settings(&self) -> RetrieverSettings {
        RetrieverSettings {
            default_k: self.query.default_k,
            max_k: self.query.max_k,
            max_tokens: self.generation.max_tokens,
            temperature: self.generation.temperature,
            timeout: Duration::from_secs(self.generation.timeout_secs),
        }
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            endpoint: self.generation.endpoint.clone(),
            model: self.generation.model.clone(),
            api_key: self.generation.api_key.clone().unwrap_or_default(),
            timeout: Duration::from_secs(self.generation.timeout_secs),
        }
    }

    /// Sample configuration file with every default spelled out.
    pub fn sample_toml() -> &'static str {
        r#"# docqa configuration

[storage]
# data_dir = "/var/lib/docqa"   # or DOCQA_DATA_DIR

[embedding]
backend = "candle"              # candle | hashing
model = "sentence-transformers/all-MiniLM-L6-v2"
dimension = 384
batch_size = 32
max_concurrent = 4

[chunking]
chunk_size = 500                # words per chunk
overlap = 50                    # words shared by consecutive chunks
min_chars = 50

[upload]
allowed_extensions = ["pdf", "txt", "md", "docx"]
max_file_size_mb = 20

[query]
default_k = 5
max_k = 50

[generation]
endpoint = "https://api.groq.com/openai/v1/chat/completions"
model = "llama-3.3-70b-versatile"
max_tokens = 1024
temperature = 0.1
timeout_secs = 30
# api_key = "..."               # or DOCQA_API_KEY / GROQ_API_KEY

[logging]
level = "info"
"#
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "docqa")
}

/// Get the XDG data directory for docqa.
pub fn default_data_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
}

/// Get the XDG config directory for docqa.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("DOCQA_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }

    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}
