//! Document chunking for docqa.
//!
//! Provides the [`WordWindowChunker`], a deterministic sliding window over the
//! whitespace-separated words of a document.

pub mod word;

pub use word::{WordWindowChunker, chunk_text};
