//! Shared embedder handle with concurrency control.

use docqa_core::{EmbedError, Embedder, EmbeddingConfig};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

/// Process-wide embedder handle.
///
/// Built once at the composition root and passed by `Arc` to every component
/// that embeds text. A semaphore bounds concurrent inference.
pub struct EmbedderPool {
    embedder: Arc<dyn Embedder>,
    config: EmbeddingConfig,
    semaphore: Semaphore,
    max_concurrent: usize,
}

impl EmbedderPool {
    /// Create a pool with the default embedding config.
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>, max_concurrent: usize) -> Self {
        Self::with_config(embedder, max_concurrent, EmbeddingConfig::default())
    }

    /// Create a pool with an explicit embedding config.
    #[must_use]
    pub fn with_config(
        embedder: Arc<dyn Embedder>,
        max_concurrent: usize,
        config: EmbeddingConfig,
    ) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            embedder,
            config,
            semaphore: Semaphore::new(max_concurrent),
            max_concurrent,
        }
    }

    /// Get the embedding dimension.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    /// Get the model name.
    #[must_use]
    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    /// Get the underlying embedder.
    #[must_use]
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        Arc::clone(&self.embedder)
    }

    /// Embed a batch of texts, one vector per input in order.
    pub async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| EmbedError::Inference(format!("semaphore error: {e}")))?;

        let outputs = self.embedder.embed_text(texts, &self.config).await?;
        if outputs.len() != texts.len() {
            return Err(EmbedError::Inference(format!(
                "embedder returned {} vectors for {} texts",
                outputs.len(),
                texts.len()
            )));
        }

        debug!("Embedded batch of {} texts", texts.len());
        Ok(outputs.into_iter().map(|o| o.embedding).collect())
    }

    /// Embed a single text.
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| EmbedError::Inference(format!("semaphore error: {e}")))?;

        self.embedder
            .embed_query(text, &self.config)
            .await
            .map(|o| o.embedding)
    }

    /// Currently available inference slots.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Get max concurrent operations.
    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}
