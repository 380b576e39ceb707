//! # docqa-core
//!
//! Core types and traits for docqa, a multi-tenant document question-answering
//! pipeline.
//!
//! ## Architecture
//!
//! ```text
//! bytes → ContentExtractor → Chunker → Embedder → VectorIndex   (ingestion)
//! query → Embedder → VectorIndex → context assembly → Generator (answering)
//! ```
//!
//! Every workspace owns its own collection in the [`VectorIndex`]; queries never
//! cross collections.
//!
//! ## Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`ContentExtractor`] | Extract text from document bytes |
//! | [`Chunker`] | Split text into overlapping word windows |
//! | [`Embedder`] | Generate vector embeddings |
//! | [`VectorIndex`] | Per-collection vector storage and search |
//! | [`Generator`] | Chat-completion answer generation |
//! | [`StatusSink`] | Observe document status transitions |
//!
//! ## Related Crates
//!
//! - `docqa-extract`: Content extraction implementations
//! - `docqa-chunker`: Word-window chunker
//! - `docqa-embed`: Embedding generation with Candle
//! - `docqa-store`: In-memory and `LanceDB` vector indexes
//! - `docqa-index`: Workspace index and ingestion worker
//! - `docqa-query`: Retrieval and answer assembly

pub mod error;
pub mod traits;
pub mod types;

pub use error::{
    ChunkError, EmbedError, Error, ExtractError, GenerateError, Result, StoreError, UploadError,
};
pub use traits::*;
pub use types::*;
