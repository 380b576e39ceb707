//! Workspace-scoped index facade.
//!
//! [`WorkspaceIndex`] turns workspace ids into collection names, embeds chunk
//! text and queries through the shared [`EmbedderPool`], and converts raw
//! distances into similarity scores.

use docqa_core::{
    Chunk, EmbeddedChunk, Error, Result, RetrievalResult, StoreError, VectorIndex,
};
use docqa_embed::EmbedderPool;
use docqa_store::collection_name;
use std::sync::Arc;
use tracing::{debug, info};

/// Per-workspace vector index.
pub struct WorkspaceIndex {
    store: Arc<dyn VectorIndex>,
    embedder: Arc<EmbedderPool>,
}

impl WorkspaceIndex {
    /// Wrap an initialized store and embedder.
    ///
    /// Fails with [`StoreError::DimensionMismatch`] when the embedder's output
    /// size differs from the store's configured dimension.
    pub fn new(store: Arc<dyn VectorIndex>, embedder: Arc<EmbedderPool>) -> Result<Self> {
        if store.dimension() != embedder.dimension() {
            return Err(StoreError::DimensionMismatch {
                expected: store.dimension(),
                actual: embedder.dimension(),
            }
            .into());
        }

        Ok(Self { store, embedder })
    }

    /// Shared embedder handle.
    #[must_use]
    pub fn embedder(&self) -> &Arc<EmbedderPool> {
        &self.embedder
    }

    /// Embed and store a document's chunks, returning how many were written.
    ///
    /// Chunk ids are `{doc_id}_chunk_{index}`, so re-running the same document
    /// overwrites its entries.
    pub async fn upsert(
        &self,
        workspace_id: &str,
        chunks: &[Chunk],
        doc_id: &str,
        filename: &str,
    ) -> Result<u32> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        let embedded: Vec<EmbeddedChunk> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddedChunk::new(chunk, vector, doc_id, filename))
            .collect();

        let collection = collection_name(workspace_id);
        self.store.upsert(&collection, &embedded).await?;

        let written = u32::try_from(embedded.len())
            .map_err(|_| Error::Other(format!("too many chunks: {}", embedded.len())))?;
        info!("Indexed {} chunks of {} into {}", written, doc_id, collection);
        Ok(written)
    }

    /// Nearest chunks to `query` in the workspace, best first.
    ///
    /// Returns an empty list when the workspace has no collection or no chunks.
    /// At most `min(k, count)` results are returned; each score is `1 - d`
    /// rounded to 4 decimals.
    pub async fn query(
        &self,
        workspace_id: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievalResult>> {
        let collection = collection_name(workspace_id);

        let size = self.store.count(&collection).await?.unwrap_or(0);
        let limit = usize::try_from(size).unwrap_or(usize::MAX).min(k);
        if limit == 0 {
            debug!("Nothing to search in {}", collection);
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed_one(query).await?;
        let hits = self
            .store
            .search(&collection, &embedding, limit)
            .await?
            .unwrap_or_default();

        debug!("Query in {} returned {} hits", collection, hits.len());
        Ok(hits
            .into_iter()
            .map(|hit| RetrievalResult {
                text: hit.text,
                filename: hit.metadata.filename,
                doc_id: hit.metadata.doc_id,
                chunk_index: hit.metadata.chunk_index,
                score: similarity_score(hit.distance),
            })
            .collect())
    }

    /// Remove every chunk of a document, returning how many were removed.
    pub async fn delete_by_document(&self, workspace_id: &str, doc_id: &str) -> Result<u64> {
        let collection = collection_name(workspace_id);
        match self.store.delete_by_doc(&collection, doc_id).await? {
            Some(removed) => {
                info!("Removed {} chunks of {} from {}", removed, doc_id, collection);
                Ok(removed)
            }
            None => {
                info!("No collection {} for workspace, nothing to delete", collection);
                Ok(0)
            }
        }
    }

    /// Number of stored chunks, 0 when the workspace has no collection.
    pub async fn count(&self, workspace_id: &str) -> Result<u64> {
        Ok(self
            .store
            .count(&collection_name(workspace_id))
            .await?
            .unwrap_or(0))
    }

    /// Remove every chunk of a workspace.
    pub async fn purge_workspace(&self, workspace_id: &str) -> Result<u64> {
        let collection = collection_name(workspace_id);
        let removed = self.store.purge(&collection).await?.unwrap_or(0);
        info!("Purged {} chunks from {}", removed, collection);
        Ok(removed)
    }
}

/// Cosine distance to similarity, rounded to 4 decimals.
fn similarity_score(distance: f32) -> f32 {
    ((1.0 - distance) * 10_000.0).round() / 10_000.0
}
