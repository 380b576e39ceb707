//! Vector storage layer for docqa.
//!
//! Implements [`VectorIndex`](docqa_core::VectorIndex) twice:
//!
//! - [`MemoryIndex`]: brute-force cosine search over in-process maps, used by
//!   tests and short-lived runs
//! - [`LanceIndex`] (feature `lancedb`): one Lance table per workspace
//!   collection, persisted under the data directory
//!
//! Workspace ids are turned into collection names with [`collection_name`].
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_store::{LanceIndex, collection_name};
//! use docqa_core::VectorIndex;
//!
//! let index = LanceIndex::new("data/index.lance".into(), 384);
//! index.init().await?;
//!
//! index.upsert(&collection_name("team-a"), &chunks).await?;
//! let hits = index.search(&collection_name("team-a"), &query_vector, 5).await?;
//! ```

pub mod collection;
#[cfg(feature = "lancedb")]
pub mod lancedb;
pub mod memory;

pub use collection::{COLLECTION_PREFIX, collection_name};
#[cfg(feature = "lancedb")]
pub use lancedb::LanceIndex;
pub use memory::MemoryIndex;
