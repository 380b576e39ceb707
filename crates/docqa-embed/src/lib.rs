//! # docqa-embed
//!
//! Embedding generation for docqa.
//!
//! ## Cargo Features
//!
//! - `candle` (default): Enables the Candle ML stack and [`CandleEmbedder`]
//! - Without `candle`: Only [`HashingEmbedder`] is available
//!
//! ## Model Details
//!
//! | Property | Value |
//! |----------|-------|
//! | Model | `sentence-transformers/all-MiniLM-L6-v2` |
//! | Dimension | 384 |
//! | Max tokens | 256 |
//! | Pooling | Mean, L2 normalized |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docqa_embed::{CandleEmbedder, EmbedderPool};
//! use std::sync::Arc;
//!
//! // Load the model once at startup
//! let embedder = CandleEmbedder::new(data_dir.join("models"));
//! embedder.init().await?;
//!
//! // Share one handle across ingestion and query paths
//! let pool = Arc::new(EmbedderPool::new(Arc::new(embedder), 4));
//! let vectors = pool.embed_batch(&["Hello world", "Machine learning"]).await?;
//! ```
//!
//! ## Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CandleEmbedder`] | BERT sentence embeddings (requires `candle` feature) |
//! | [`HashingEmbedder`] | Deterministic feature-hashing embeddings (always available) |
//! | [`EmbedderPool`] | Shared handle with semaphore limiting (always available) |

#[cfg(feature = "candle")]
pub mod candle;

#[cfg(feature = "candle")]
pub use candle::CandleEmbedder;

pub mod hashing;
pub mod pool;

pub use hashing::HashingEmbedder;
pub use pool::EmbedderPool;
