//! Word-window chunking strategy with overlap.

use docqa_core::{Chunk, ChunkConfig, ChunkError, Chunker};
use tracing::debug;

/// Sliding word-window chunker.
///
/// Whitespace runs collapse to single spaces. Windows of `chunk_size` words
/// advance by `chunk_size - overlap` words, and windows whose trimmed length is
/// at most `min_chars` characters are dropped. Kept chunks are numbered
/// sequentially from zero.
pub struct WordWindowChunker;

impl WordWindowChunker {
    /// Create a new word-window chunker.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for WordWindowChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for WordWindowChunker {
    fn name(&self) -> &str {
        "word_window"
    }

    fn chunk(&self, text: &str, config: &ChunkConfig) -> Result<Vec<Chunk>, ChunkError> {
        chunk_text(text, config)
    }
}

/// Split `text` into overlapping word windows.
pub fn chunk_text(text: &str, config: &ChunkConfig) -> Result<Vec<Chunk>, ChunkError> {
    config.validate()?;

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Ok(Vec::new());
    }

    let step = config.step();
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = (start + config.chunk_size).min(words.len());
        let window = words[start..end].join(" ");

        if window.trim().chars().count() > config.min_chars {
            let index = u32::try_from(chunks.len())
                .map_err(|_| ChunkError::Failed("too many chunks".to_string()))?;
            chunks.push(Chunk {
                text: window,
                index,
            });
        }

        start += step;
    }

    debug!(
        "Chunked {} words into {} chunks (size {}, overlap {})",
        words.len(),
        chunks.len(),
        config.chunk_size,
        config.overlap
    );
    Ok(chunks)
}
