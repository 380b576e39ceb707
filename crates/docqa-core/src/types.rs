//! Core types for docqa.
//!
//! This module contains the shared data structures used across the pipeline:
//!
//! ## Documents
//! - [`FileType`]: Declared type tag of an uploaded document
//! - [`DocumentStatus`]: Processing state of a document
//! - [`DocumentReport`]: Status transition delivered to a [`StatusSink`](crate::StatusSink)
//!
//! ## Chunks
//! - [`Chunk`]: An ordered window of document text
//! - [`ChunkConfig`]: Word-window parameters
//! - [`EmbeddedChunk`]: A chunk with its vector and metadata, as stored in the index
//!
//! ## Embeddings
//! - [`EmbeddingConfig`]: Configuration for embedding generation
//! - [`EmbeddingOutput`]: Result of embedding a text
//!
//! ## Retrieval
//! - [`SearchHit`]: Raw nearest-neighbour hit returned by a vector index
//! - [`RetrievalResult`]: A scored chunk returned to the query path
//! - [`SourceCitation`]: De-duplicated source attached to an answer
//! - [`Answer`]: Final answer with sources
//!
//! ## Generation
//! - [`ChatMessage`] / [`ChatRole`]: Chat-completion messages
//! - [`GenerationRequest`]: Request handed to a [`Generator`](crate::Generator)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ChunkError;

// ============================================================================
// Documents
// ============================================================================

/// Declared type of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Plain text (`.txt`)
    Text,
    /// Markdown (`.md`)
    Markdown,
    /// PDF (`.pdf`)
    Pdf,
    /// Word document (`.docx`)
    Docx,
}

impl FileType {
    /// All known file types.
    pub const ALL: [FileType; 4] = [Self::Pdf, Self::Text, Self::Markdown, Self::Docx];

    /// Resolve a type tag such as `"pdf"`, `".PDF"` or `"md"`.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "txt" => Some(Self::Text),
            "md" => Some(Self::Markdown),
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    /// Canonical extension for this type, without the dot.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Markdown => "md",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Processing status of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Accepted and queued or running
    Processing,
    /// Indexed successfully
    Ready,
    /// Terminal failure; see the report's error message
    Error,
}

impl DocumentStatus {
    /// Whether this status ends the document's lifecycle.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Error)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Status transition for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentReport {
    /// Document identifier
    pub doc_id: String,
    /// Owning workspace
    pub workspace_id: String,
    /// Original filename
    pub filename: String,
    /// New status
    pub status: DocumentStatus,
    /// Number of chunks stored (0 unless `Ready`)
    pub chunk_count: u32,
    /// Failure description when `Error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// When the transition happened
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Chunks
// ============================================================================

/// An ordered window of document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Window text, words joined by single spaces
    pub text: String,
    /// Position among the document's kept chunks
    pub index: u32,
}

/// Word-window chunking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Words per window
    pub chunk_size: usize,
    /// Words shared by consecutive windows
    pub overlap: usize,
    /// Windows whose trimmed length is at most this many characters are dropped
    pub min_chars: usize,
}

impl ChunkConfig {
    /// Create a config with the default minimum length.
    #[must_use]
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
            ..Self::default()
        }
    }

    /// Words the window advances per step.
    #[must_use]
    pub fn step(&self) -> usize {
        self.chunk_size.saturating_sub(self.overlap)
    }

    /// Reject configurations where the window would never advance.
    pub fn validate(&self) -> Result<(), ChunkError> {
        if self.chunk_size == 0 {
            return Err(ChunkError::InvalidConfig(
                "chunk_size must be > 0".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(ChunkError::InvalidConfig(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
            min_chars: 50,
        }
    }
}

/// Metadata stored next to every chunk vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub doc_id: String,
    pub filename: String,
    pub chunk_index: u32,
}

/// A chunk ready to be written to a vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    /// Stable id, see [`EmbeddedChunk::chunk_id`]
    pub id: String,
    /// Chunk text
    pub text: String,
    /// Dense vector
    pub vector: Vec<f32>,
    /// Owning document metadata
    pub metadata: ChunkMetadata,
}

impl EmbeddedChunk {
    /// Build from a chunk and its vector.
    #[must_use]
    pub fn new(chunk: &Chunk, vector: Vec<f32>, doc_id: &str, filename: &str) -> Self {
        Self {
            id: Self::chunk_id(doc_id, chunk.index),
            text: chunk.text.clone(),
            vector,
            metadata: ChunkMetadata {
                doc_id: doc_id.to_string(),
                filename: filename.to_string(),
                chunk_index: chunk.index,
            },
        }
    }

    /// Stable id for the `index`-th chunk of `doc_id`.
    #[must_use]
    pub fn chunk_id(doc_id: &str, index: u32) -> String {
        format!("{doc_id}_chunk_{index}")
    }
}

// ============================================================================
// Embeddings
// ============================================================================

/// Configuration for embedding generation.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Normalize embeddings to unit length
    pub normalize: bool,
    /// Batch size for processing
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            normalize: true,
            batch_size: 32,
        }
    }
}

/// Output from embedding.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    /// The embedding vector
    pub embedding: Vec<f32>,
    /// Number of tokens in input
    pub token_count: usize,
}

// ============================================================================
// Retrieval
// ============================================================================

/// A nearest-neighbour hit as returned by a vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    /// Cosine distance to the query (0 = identical direction)
    pub distance: f32,
}

/// A scored chunk returned by a workspace query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub text: String,
    pub filename: String,
    pub doc_id: String,
    pub chunk_index: u32,
    /// Cosine similarity in [-1, 1], rounded to 4 decimals
    pub score: f32,
}

/// One de-duplicated source in an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCitation {
    pub filename: String,
    pub doc_id: String,
    pub chunk_index: u32,
    pub score: f32,
    /// At most 200 characters of the chunk, plus `...` when truncated
    pub preview: String,
}

/// Answer to a workspace question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Generated answer, or a degraded description when generation failed
    pub answer: String,
    /// Sources in rank order
    pub sources: Vec<SourceCitation>,
    /// Set when the answer text is a degraded error description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_error: Option<String>,
}

impl Answer {
    /// Whether generation failed and the answer is degraded.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.generation_error.is_some()
    }
}

// ============================================================================
// Generation
// ============================================================================

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A chat-completion message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A request for one chat completion.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub messages: Vec<ChatMessage>,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}
