//! Workspace indexing for docqa.
//!
//! This crate ties extraction, chunking, embedding and vector storage into
//! the ingestion path:
//!
//! - [`WorkspaceIndex`]: per-workspace upsert, query, delete and count
//! - [`IngestionService`]: extract → chunk → embed → upsert for one document
//! - [`IngestWorker`]: background queue reporting status transitions
//! - [`UploadPolicy`]: extension allow-list and size ceiling
//! - [`IndexUpdate`]: events emitted during ingestion
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_index::{IngestJob, IngestWorker, IngestionService, LogStatusSink};
//!
//! let worker = IngestWorker::spawn(service, Arc::new(LogStatusSink), 64);
//! let mut updates = worker.subscribe();
//!
//! let ack = worker.submit(job).await?; // status: processing
//!
//! while let Ok(update) = updates.recv().await {
//!     match update {
//!         IndexUpdate::DocumentIndexed { doc_id, chunk_count, .. } => { /* ... */ }
//!         IndexUpdate::DocumentFailed { doc_id, error, .. } => { /* ... */ }
//!         _ => {}
//!     }
//! }
//! ```

pub mod ingest;
pub mod status;
pub mod upload;
pub mod workspace;

pub use ingest::{IndexUpdate, IngestJob, IngestWorker, IngestionService};
pub use status::{LogStatusSink, MemoryStatusSink};
pub use upload::{UploadPolicy, extension_of};
pub use workspace::WorkspaceIndex;
