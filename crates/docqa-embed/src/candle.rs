//! Sentence-transformer embedder using Candle.
//!
//! Defaults to `sentence-transformers/all-MiniLM-L6-v2`:
//! - 384 dimensions
//! - 256 max tokens
//! - BERT architecture, mean pooled and L2 normalized

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use docqa_core::{EmbedError, Embedder, EmbeddingConfig, EmbeddingOutput};
use hf_hub::api::tokio::ApiBuilder;
use hf_hub::{Repo, RepoType};
use std::path::PathBuf;
use tokenizers::Tokenizer;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Default model identifier on Hugging Face Hub.
pub const DEFAULT_MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Embedding dimension of the default model.
pub const DEFAULT_DIMENSION: usize = 384;

/// Maximum sequence length used by the default model.
const MAX_TOKENS: usize = 256;

/// Tokenizer and weights, loaded once.
struct LoadedModel {
    model: BertModel,
    tokenizer: Tokenizer,
}

/// Sentence-transformer embedder backed by Candle.
///
/// The model is loaded at most once per embedder. Call [`CandleEmbedder::init`]
/// at startup; concurrent first use is serialized by the internal cell so the
/// weights are never loaded twice.
pub struct CandleEmbedder {
    model_id: String,
    dimension: usize,
    device: Device,
    cache_dir: PathBuf,
    loaded: OnceCell<LoadedModel>,
}

impl CandleEmbedder {
    /// Embedder for the default model, caching weights under `cache_dir`.
    #[must_use]
    pub fn new(cache_dir: PathBuf) -> Self {
        Self::with_model(cache_dir, DEFAULT_MODEL_ID, DEFAULT_DIMENSION)
    }

    /// Embedder for any BERT sentence-transformer with a known output dimension.
    #[must_use]
    pub fn with_model(cache_dir: PathBuf, model_id: &str, dimension: usize) -> Self {
        let device = Device::cuda_if_available(0).unwrap_or(Device::Cpu);
        info!("CandleEmbedder using device: {:?}", device);

        Self {
            model_id: model_id.to_string(),
            dimension,
            device,
            cache_dir,
            loaded: OnceCell::new(),
        }
    }

    /// Whether the model has been loaded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.loaded.initialized()
    }

    /// Download (if needed) and load the model.
    pub async fn init(&self) -> Result<(), EmbedError> {
        self.loaded().await.map(|_| ())
    }

    async fn loaded(&self) -> Result<&LoadedModel, EmbedError> {
        self.loaded.get_or_try_init(|| self.load()).await
    }

    async fn load(&self) -> Result<LoadedModel, EmbedError> {
        info!("Loading embedding model {}", self.model_id);

        let api = ApiBuilder::new()
            .with_cache_dir(self.cache_dir.clone())
            .build()
            .map_err(|e| EmbedError::ModelLoad(format!("Failed to create HF API: {e}")))?;
        let repo = api.repo(Repo::new(self.model_id.clone(), RepoType::Model));

        debug!("Fetching tokenizer, config and weights");
        let tokenizer_path = repo
            .get("tokenizer.json")
            .await
            .map_err(|e| EmbedError::ModelLoad(format!("Failed to download tokenizer: {e}")))?;
        let config_path = repo
            .get("config.json")
            .await
            .map_err(|e| EmbedError::ModelLoad(format!("Failed to download config: {e}")))?;
        let weights_path = repo
            .get("model.safetensors")
            .await
            .map_err(|e| EmbedError::ModelLoad(format!("Failed to download weights: {e}")))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| EmbedError::ModelLoad(format!("Failed to load tokenizer: {e}")))?;

        let config_str = tokio::fs::read_to_string(&config_path)
            .await
            .map_err(|e| EmbedError::ModelLoad(format!("Failed to read config: {e}")))?;
        let config: Config = serde_json::from_str(&config_str)
            .map_err(|e| EmbedError::ModelLoad(format!("Failed to parse config: {e}")))?;

        // SAFETY: the safetensors file comes from the local hub cache and is
        // only mapped for reading.
        #[allow(unsafe_code)]
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &self.device)
                .map_err(|e| EmbedError::ModelLoad(format!("Failed to load weights: {e}")))?
        };
        let model = BertModel::load(vb, &config)
            .map_err(|e| EmbedError::ModelLoad(format!("Failed to create BERT model: {e}")))?;

        let model = LoadedModel { model, tokenizer };
        let sample = self.encode_batch(&model, &["dimension check"], true)?;
        let actual = sample.first().map_or(0, |o| o.embedding.len());
        if actual != self.dimension {
            return Err(EmbedError::ModelLoad(format!(
                "{} produces {actual}-dimensional vectors, configured for {}",
                self.model_id, self.dimension
            )));
        }

        info!("Embedding model {} ready", self.model_id);
        Ok(model)
    }

    fn encode_batch(
        &self,
        loaded: &LoadedModel,
        texts: &[&str],
        normalize: bool,
    ) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        let encodings = loaded
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbedError::Inference(format!("Tokenization failed: {e}")))?;

        let max_len = encodings
            .iter()
            .map(tokenizers::Encoding::len)
            .max()
            .unwrap_or(0)
            .min(MAX_TOKENS);
        let batch_size = texts.len();

        let mut input_ids = Vec::with_capacity(batch_size * max_len);
        let mut attention_mask = Vec::with_capacity(batch_size * max_len);
        let mut token_counts = Vec::with_capacity(batch_size);

        for encoding in &encodings {
            let ids = encoding.get_ids();
            let len = ids.len().min(max_len);
            token_counts.push(len);
            input_ids.extend_from_slice(&ids[..len]);
            input_ids.extend(std::iter::repeat_n(0u32, max_len - len));
            attention_mask.extend(std::iter::repeat_n(1u32, len));
            attention_mask.extend(std::iter::repeat_n(0u32, max_len - len));
        }

        let shape = (batch_size, max_len);
        let input_ids = Tensor::from_vec(input_ids, shape, &self.device)
            .map_err(|e| EmbedError::Inference(format!("input_ids tensor: {e}")))?;
        let attention_mask = Tensor::from_vec(attention_mask, shape, &self.device)
            .map_err(|e| EmbedError::Inference(format!("attention_mask tensor: {e}")))?;
        let token_type_ids = input_ids
            .zeros_like()
            .map_err(|e| EmbedError::Inference(format!("token_type_ids tensor: {e}")))?;

        let hidden = loaded
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))
            .map_err(|e| EmbedError::Inference(format!("Model forward failed: {e}")))?;

        let pooled = mean_pool(&hidden, &attention_mask)?;
        let pooled = if normalize {
            l2_normalize(&pooled)?
        } else {
            pooled
        };

        let rows = pooled
            .to_vec2::<f32>()
            .map_err(|e| EmbedError::Inference(format!("Failed to read embeddings: {e}")))?;

        Ok(rows
            .into_iter()
            .zip(token_counts)
            .map(|(embedding, token_count)| EmbeddingOutput {
                embedding,
                token_count,
            })
            .collect())
    }
}

/// Average token embeddings, ignoring padding.
fn mean_pool(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor, EmbedError> {
    let inference = |stage: &str, e: candle_core::Error| {
        EmbedError::Inference(format!("mean pooling ({stage}): {e}"))
    };

    let mask = attention_mask
        .to_dtype(DType::F32)
        .map_err(|e| inference("dtype", e))?
        .unsqueeze(2)
        .map_err(|e| inference("unsqueeze", e))?;
    let summed = hidden
        .broadcast_mul(&mask)
        .map_err(|e| inference("mask", e))?
        .sum(1)
        .map_err(|e| inference("sum", e))?;
    let counts = mask
        .sum(1)
        .map_err(|e| inference("count", e))?
        .clamp(1e-9, f64::MAX)
        .map_err(|e| inference("clamp", e))?;

    summed
        .broadcast_div(&counts)
        .map_err(|e| inference("divide", e))
}

/// Scale each row to unit length.
fn l2_normalize(embeddings: &Tensor) -> Result<Tensor, EmbedError> {
    let norm = embeddings
        .sqr()
        .and_then(|t| t.sum_keepdim(1))
        .and_then(|t| t.sqrt())
        .and_then(|t| t.clamp(1e-12, f64::MAX))
        .map_err(|e| EmbedError::Inference(format!("norm failed: {e}")))?;

    embeddings
        .broadcast_div(&norm)
        .map_err(|e| EmbedError::Inference(format!("normalize failed: {e}")))
}

#[async_trait]
impl Embedder for CandleEmbedder {
    fn model_name(&self) -> &str {
        &self.model_id
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
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let loaded = self.loaded().await?;
        debug!(
            "Embedding {} texts with batch_size {}",
            texts.len(),
            config.batch_size
        );

        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(config.batch_size.max(1)) {
            results.extend(self.encode_batch(loaded, batch, config.normalize)?);
        }
        Ok(results)
    }
}
