//! In-memory vector index for tests and embedded use.
//!
//! [`MemoryIndex`] keeps every collection in a map guarded by one `RwLock`, so
//! upserts, deletes and searches against the same collection are serialized.

use async_trait::async_trait;
use docqa_core::{EmbeddedChunk, SearchHit, StoreError, VectorIndex};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

type Collection = HashMap<String, EmbeddedChunk>;

/// In-memory vector index with brute-force cosine search.
///
/// # Example
///
/// ```rust
/// use docqa_store::MemoryIndex;
/// use docqa_core::VectorIndex;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let index = MemoryIndex::new(384);
/// index.init().await?;
///
/// // Collections only exist after the first upsert
/// assert_eq!(index.count("ws-empty").await?, None);
/// # Ok(())
/// # }
/// ```
pub struct MemoryIndex {
    dimension: usize,
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl MemoryIndex {
    /// Create an empty index for vectors of `dimension` components.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            collections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Names of the collections created so far.
    pub async fn collection_names(&self) -> Vec<String> {
        let collections = self.collections.read().await;
        let mut names: Vec<String> = collections.keys().cloned().collect();
        names.sort();
        names
    }

    /// Compute cosine similarity between two vectors.
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot / (norm_a * norm_b)
    }

    fn check_dimension(&self, actual: usize) -> Result<(), StoreError> {
        if actual == self.dimension {
            Ok(())
        } else {
            Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual,
            })
        }
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn init(&self) -> Result<(), StoreError> {
        debug!("MemoryIndex initialized (dimension: {})", self.dimension);
        Ok(())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert(&self, collection: &str, chunks: &[EmbeddedChunk]) -> Result<(), StoreError> {
        // validate everything before touching the map so a bad batch writes nothing
        for chunk in chunks {
            self.check_dimension(chunk.vector.len())?;
        }
        if chunks.is_empty() {
            return Ok(());
        }

        let mut collections = self.collections.write().await;
        let entries = collections.entry(collection.to_string()).or_default();
        for chunk in chunks {
            entries.insert(chunk.id.clone(), chunk.clone());
        }
        debug!("Upserted {} chunks into {}", chunks.len(), collection);
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Option<Vec<SearchHit>>, StoreError> {
        self.check_dimension(embedding.len())?;

        let collections = self.collections.read().await;
        let Some(entries) = collections.get(collection) else {
            return Ok(None);
        };

        let mut scored: Vec<(f32, &EmbeddedChunk)> = entries
            .values()
            .map(|chunk| {
                let distance = 1.0 - Self::cosine_similarity(embedding, &chunk.vector);
                (distance, chunk)
            })
            .collect();

        scored.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.id.cmp(&b.1.id))
        });

        Ok(Some(
            scored
                .into_iter()
                .take(limit)
                .map(|(distance, chunk)| SearchHit {
                    id: chunk.id.clone(),
                    text: chunk.text.clone(),
                    metadata: chunk.metadata.clone(),
                    distance,
                })
                .collect(),
        ))
    }

    async fn delete_by_doc(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> Result<Option<u64>, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(entries) = collections.get_mut(collection) else {
            return Ok(None);
        };

        let before = entries.len();
        entries.retain(|_, chunk| chunk.metadata.doc_id != doc_id);
        let deleted = (before - entries.len()) as u64;

        debug!("Deleted {} chunks of {} from {}", deleted, doc_id, collection);
        Ok(Some(deleted))
    }

    async fn count(&self, collection: &str) -> Result<Option<u64>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).map(|c| c.len() as u64))
    }

    async fn purge(&self, collection: &str) -> Result<Option<u64>, StoreError> {
        let mut collections = self.collections.write().await;
        Ok(collections.remove(collection).map(|c| c.len() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::ChunkMetadata;

    fn chunk(doc_id: &str, index: u32, vector: Vec<f32>) -> EmbeddedChunk {
        EmbeddedChunk {
            id: EmbeddedChunk::chunk_id(doc_id, index),
            text: format!("{doc_id} chunk {index}"),
            vector,
            metadata: ChunkMetadata {
                doc_id: doc_id.to_string(),
                filename: format!("{doc_id}.txt"),
                chunk_index: index,
            },
        }
    }

    #[tokio::test]
    async fn test_absent_collection_is_none() {
        let index = MemoryIndex::new(3);
        index.init().await.unwrap();

        assert_eq!(index.count("ws-a").await.unwrap(), None);
        assert_eq!(index.search("ws-a", &[1.0, 0.0, 0.0], 5).await.unwrap(), None);
        assert_eq!(index.delete_by_doc("ws-a", "d1").await.unwrap(), None);
        assert_eq!(index.purge("ws-a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_upsert_creates_collection_lazily() {
        let index = MemoryIndex::new(3);
        index
            .upsert("ws-a", &[chunk("d1", 0, vec![1.0, 0.0, 0.0])])
            .await
            .unwrap();

        assert_eq!(index.count("ws-a").await.unwrap(), Some(1));
        assert_eq!(index.collection_names().await, vec!["ws-a".to_string()]);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_id() {
        let index = MemoryIndex::new(3);
        let batch = vec![
            chunk("d1", 0, vec![1.0, 0.0, 0.0]),
            chunk("d1", 1, vec![0.0, 1.0, 0.0]),
        ];
        index.upsert("ws-a", &batch).await.unwrap();
        index.upsert("ws-a", &batch).await.unwrap();

        assert_eq!(index.count("ws-a").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_search_orders_by_distance() {
        let index = MemoryIndex::new(3);
        index
            .upsert(
                "ws-a",
                &[
                    chunk("d1", 0, vec![0.0, 1.0, 0.0]),
                    chunk("d1", 1, vec![1.0, 0.0, 0.0]),
                    chunk("d1", 2, vec![-1.0, 0.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        let hits = index
            .search("ws-a", &[1.0, 0.0, 0.0], 3)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].id, "d1_chunk_1");
        assert!(hits[0].distance.abs() < 1e-6);
        assert_eq!(hits[1].id, "d1_chunk_0");
        assert!((hits[1].distance - 1.0).abs() < 1e-6);
        assert_eq!(hits[2].id, "d1_chunk_2");
        assert!((hits[2].distance - 2.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_search_respects_limit() {
        let index = MemoryIndex::new(3);
        let batch: Vec<_> = (0..5).map(|i| chunk("d1", i, vec![1.0, 0.0, 0.0])).collect();
        index.upsert("ws-a", &batch).await.unwrap();

        let hits = index.search("ws-a", &[1.0, 0.0, 0.0], 2).await.unwrap().unwrap();
        assert_eq!(hits.len(), 2);
        // equal distances fall back to id order
        assert_eq!(hits[0].id, "d1_chunk_0");
        assert_eq!(hits[1].id, "d1_chunk_1");
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let index = MemoryIndex::new(3);
        index
            .upsert("ws-a", &[chunk("d1", 0, vec![1.0, 0.0, 0.0])])
            .await
            .unwrap();
        index
            .upsert("ws-b", &[chunk("d2", 0, vec![1.0, 0.0, 0.0])])
            .await
            .unwrap();

        let hits = index.search("ws-b", &[1.0, 0.0, 0.0], 10).await.unwrap().unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata.doc_id, "d2");
    }

    #[tokio::test]
    async fn test_delete_by_doc_removes_only_that_doc() {
        let index = MemoryIndex::new(3);
        index
            .upsert(
                "ws-a",
                &[
                    chunk("d1", 0, vec![1.0, 0.0, 0.0]),
                    chunk("d1", 1, vec![1.0, 0.0, 0.0]),
                    chunk("d2", 0, vec![0.0, 1.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        assert_eq!(index.delete_by_doc("ws-a", "d1").await.unwrap(), Some(2));
        assert_eq!(index.count("ws-a").await.unwrap(), Some(1));
        assert_eq!(index.delete_by_doc("ws-a", "d1").await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_purge_drops_collection() {
        let index = MemoryIndex::new(3);
        index
            .upsert("ws-a", &[chunk("d1", 0, vec![1.0, 0.0, 0.0])])
            .await
            .unwrap();

        assert_eq!(index.purge("ws-a").await.unwrap(), Some(1));
        assert_eq!(index.count("ws-a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let index = MemoryIndex::new(3);
        let err = index
            .upsert(
                "ws-a",
                &[
                    chunk("d1", 0, vec![1.0, 0.0, 0.0]),
                    chunk("d1", 1, vec![1.0, 0.0]),
                ],
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StoreError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
        // nothing from the rejected batch was written
        assert_eq!(index.count("ws-a").await.unwrap(), None);
    }

    #[test]
    fn test_cosine_similarity() {
        let sim = MemoryIndex::cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0]);
        assert!((sim - 1.0).abs() < 0.001);

        let sim = MemoryIndex::cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);
        assert!(sim.abs() < 0.001);

        let sim = MemoryIndex::cosine_similarity(&[1.0, 0.0, 0.0], &[-1.0, 0.0, 0.0]);
        assert!((sim - (-1.0)).abs() < 0.001);

        assert_eq!(MemoryIndex::cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
