//! Feature-hashing embedder that needs no model download.
//!
//! Each lower-cased alphanumeric token is hashed with blake3 into one of
//! `dimension` signed buckets and the resulting bag-of-words vector is L2
//! normalized. Texts sharing vocabulary therefore have positive cosine
//! similarity, which is enough for tests and offline operation.

use async_trait::async_trait;
use docqa_core::{EmbedError, Embedder, EmbeddingConfig, EmbeddingOutput};

/// Default number of buckets, matching `all-MiniLM-L6-v2`.
pub const DEFAULT_DIMENSION: usize = 384;

/// Deterministic bag-of-words embedder.
///
/// # Example
///
/// ```rust
/// use docqa_embed::HashingEmbedder;
/// use docqa_core::{Embedder, EmbeddingConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let embedder = HashingEmbedder::with_dimension(64);
/// let outputs = embedder
///     .embed_text(&["red apples", "green apples"], &EmbeddingConfig::default())
///     .await?;
///
/// assert_eq!(outputs[0].embedding.len(), 64);
/// # Ok(())
/// # }
/// ```
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    /// Create a hashing embedder with the default dimension (384).
    #[must_use]
    pub fn new() -> Self {
        Self::with_dimension(DEFAULT_DIMENSION)
    }

    /// Create a hashing embedder with a custom dimension.
    #[must_use]
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn embed_one(&self, text: &str, normalize: bool) -> EmbeddingOutput {
        let mut vector = vec![0.0f32; self.dimension];
        let mut token_count = 0;

        for token in tokenize(text) {
            let hash = blake3::hash(token.as_bytes());
            let bytes = hash.as_bytes();
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&bytes[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
            token_count += 1;
        }

        if normalize {
            let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
            if norm > 0.0 {
                for v in &mut vector {
                    *v /= norm;
                }
            }
        }

        EmbeddingOutput {
            embedding: vector,
            token_count,
        }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model_name(&self) -> &str {
        "hashing"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn max_tokens(&self) -> usize {
        usize::MAX
    }

    async fn embed_text(
        &self,
        texts: &[&str],
        config: &EmbeddingConfig,
    ) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        Ok(texts
            .iter()
            .map(|text| self.embed_one(text, config.normalize))
            .collect())
    }
}
