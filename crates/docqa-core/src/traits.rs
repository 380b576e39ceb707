//! Core traits for docqa components.
//!
//! - [`ContentExtractor`]: Turn document bytes into text
//! - [`Chunker`]: Split text into ordered windows
//! - [`Embedder`]: Generate vector embeddings
//! - [`VectorIndex`]: Store and search vectors, one collection per workspace
//! - [`Generator`]: Chat-completion collaborator
//! - [`StatusSink`]: Receives document status transitions
//!
//! Components are composed as `Arc<dyn Trait>` handles at the composition root.

use async_trait::async_trait;

use crate::error::{ChunkError, EmbedError, ExtractError, GenerateError, StoreError};
use crate::types::{
    Chunk, ChunkConfig, DocumentReport, EmbeddedChunk, EmbeddingConfig, EmbeddingOutput,
    FileType, GenerationRequest, SearchHit,
};

// ============================================================================
// Content Extraction
// ============================================================================

/// Trait for extracting text from document bytes.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// File types this extractor handles.
    fn file_types(&self) -> &[FileType];

    /// Extract the document text.
    async fn extract_bytes(&self, data: &[u8], file_type: FileType)
    -> Result<String, ExtractError>;
}

// ============================================================================
// Chunking
// ============================================================================

/// Trait for splitting text into chunks.
///
/// Chunking is pure and deterministic: identical input and config always yield
/// the identical ordered sequence.
pub trait Chunker: Send + Sync {
    /// Name of this chunking strategy.
    fn name(&self) -> &str;

    /// Chunk the text.
    fn chunk(&self, text: &str, config: &ChunkConfig) -> Result<Vec<Chunk>, ChunkError>;
}

// ============================================================================
// Embedding
// ============================================================================

/// Trait for generating embeddings.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model name/identifier.
    fn model_name(&self) -> &str;

    /// Embedding dimension. Constant for the lifetime of the embedder.
    fn dimension(&self) -> usize;

    /// Maximum tokens per input.
    fn max_tokens(&self) -> usize;

    /// Embed text content.
    async fn embed_text(
        &self,
        texts: &[&str],
        config: &EmbeddingConfig,
    ) -> Result<Vec<EmbeddingOutput>, EmbedError>;

    /// Embed a query.
    async fn embed_query(
        &self,
        query: &str,
        config: &EmbeddingConfig,
    ) -> Result<EmbeddingOutput, EmbedError> {
        let results = self.embed_text(&[query], config).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::Inference("empty embedding result".to_string()))
    }
}

// ============================================================================
// Vector Index
// ============================================================================

/// Trait for a vector index partitioned into named collections.
///
/// Collections are created on first upsert and only looked up otherwise. Read and
/// delete operations return `None` when the collection does not exist.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Initialize the index.
    async fn init(&self) -> Result<(), StoreError>;

    /// Vector dimension every stored chunk must have.
    fn dimension(&self) -> usize;

    /// Insert or overwrite chunks by id, creating the collection if needed.
    async fn upsert(&self, collection: &str, chunks: &[EmbeddedChunk]) -> Result<(), StoreError>;

    /// Nearest neighbours by ascending cosine distance.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Option<Vec<SearchHit>>, StoreError>;

    /// Delete every chunk of a document, returning how many were removed.
    async fn delete_by_doc(&self, collection: &str, doc_id: &str)
    -> Result<Option<u64>, StoreError>;

    /// Number of chunks in a collection.
    async fn count(&self, collection: &str) -> Result<Option<u64>, StoreError>;

    /// Remove every chunk of a collection, returning how many were removed.
    async fn purge(&self, collection: &str) -> Result<Option<u64>, StoreError>;
}

// ============================================================================
// Generation
// ============================================================================

/// Chat-completion collaborator.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Model used for completions.
    fn model_name(&self) -> &str;

    /// Produce the assistant reply for a request.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerateError>;
}

// ============================================================================
// Status reporting
// ============================================================================

/// Receives document status transitions produced by ingestion.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn report(&self, report: &DocumentReport);
}
