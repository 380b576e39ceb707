//! `LanceDB` implementation of `VectorIndex`.
//!
//! Every workspace collection is its own Lance table inside one database
//! directory. Tables are created on first upsert and never dropped; purging a
//! workspace deletes its rows.

use arrow_array::builder::{FixedSizeListBuilder, Float32Builder};
use arrow_array::{
    Array, ArrayRef, Float32Array, RecordBatch, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow_schema::{DataType, Field, Schema};
use async_trait::async_trait;
use docqa_core::{ChunkMetadata, EmbeddedChunk, SearchHit, StoreError, VectorIndex};
use futures::TryStreamExt;
use lancedb::DistanceType;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, Table, connect};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// LanceDB-backed vector index.
pub struct LanceIndex {
    /// Path to the `LanceDB` database
    db_path: PathBuf,
    /// Embedding dimension
    dimension: usize,
    /// Database connection (lazy initialized)
    connection: RwLock<Option<Connection>>,
    /// Open table handles by collection name
    tables: RwLock<HashMap<String, Table>>,
}

impl LanceIndex {
    /// Create a new `LanceIndex`.
    #[must_use]
    pub fn new(db_path: PathBuf, dimension: usize) -> Self {
        Self {
            db_path,
            dimension,
            connection: RwLock::new(None),
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Get the database path.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Get or create connection.
    async fn get_connection(&self) -> Result<Connection, StoreError> {
        {
            let conn = self.connection.read().await;
            if let Some(ref c) = *conn {
                return Ok(c.clone());
            }
        }

        let mut conn = self.connection.write().await;
        if let Some(ref c) = *conn {
            return Ok(c.clone());
        }

        let db_path_str = self.db_path.to_string_lossy().to_string();
        let new_conn = connect(&db_path_str)
            .execute()
            .await
            .map_err(|e| StoreError::Init(format!("Failed to connect to LanceDB: {e}")))?;
        *conn = Some(new_conn.clone());
        Ok(new_conn)
    }

    /// Build the collection table schema.
    fn schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("doc_id", DataType::Utf8, false),
            Field::new("filename", DataType::Utf8, false),
            Field::new("chunk_index", DataType::UInt32, false),
            Field::new("text", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    self.dimension as i32,
                ),
                false,
            ),
        ]))
    }

    /// Open an existing collection table, `None` if it was never created.
    async fn open_table(&self, collection: &str) -> Result<Option<Table>, StoreError> {
        {
            let tables = self.tables.read().await;
            if let Some(t) = tables.get(collection) {
                return Ok(Some(t.clone()));
            }
        }

        let conn = self.get_connection().await?;
        let names = conn
            .table_names()
            .execute()
            .await
            .map_err(|e| StoreError::Query(format!("Failed to list tables: {e}")))?;
        if !names.iter().any(|n| n == collection) {
            return Ok(None);
        }

        let table = conn
            .open_table(collection)
            .execute()
            .await
            .map_err(|e| StoreError::Init(format!("Failed to open table {collection}: {e}")))?;
        self.check_table_dimension(&table).await?;

        let mut tables = self.tables.write().await;
        Ok(Some(
            tables
                .entry(collection.to_string())
                .or_insert(table)
                .clone(),
        ))
    }

    /// Open the collection table, creating it if needed.
    async fn open_or_create_table(&self, collection: &str) -> Result<Table, StoreError> {
        if let Some(table) = self.open_table(collection).await? {
            return Ok(table);
        }

        let conn = self.get_connection().await?;
        let mut tables = self.tables.write().await;
        if let Some(t) = tables.get(collection) {
            return Ok(t.clone());
        }

        info!("Creating table {}", collection);
        let table = conn
            .create_empty_table(collection, self.schema())
            .execute()
            .await
            .map_err(|e| StoreError::Init(format!("Failed to create table {collection}: {e}")))?;
        tables.insert(collection.to_string(), table.clone());
        Ok(table)
    }

    async fn check_table_dimension(&self, table: &Table) -> Result<(), StoreError> {
        let schema = table
            .schema()
            .await
            .map_err(|e| StoreError::Init(format!("Failed to read table schema: {e}")))?;
        let stored = schema
            .field_with_name("vector")
            .ok()
            .and_then(|f| match f.data_type() {
                DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
                _ => None,
            });

        match stored {
            Some(actual) if actual != self.dimension => Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual,
            }),
            Some(_) => Ok(()),
            None => Err(StoreError::Init(
                "table has no fixed-size vector column".to_string(),
            )),
        }
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

    /// Convert chunks to an Arrow `RecordBatch`.
    fn chunks_to_batch(&self, chunks: &[EmbeddedChunk]) -> Result<RecordBatch, StoreError> {
        let ids: Vec<_> = chunks.iter().map(|c| c.id.as_str()).collect();
        let doc_ids: Vec<_> = chunks.iter().map(|c| c.metadata.doc_id.as_str()).collect();
        let filenames: Vec<_> = chunks
            .iter()
            .map(|c| c.metadata.filename.as_str())
            .collect();
        let chunk_indices: Vec<_> = chunks.iter().map(|c| c.metadata.chunk_index).collect();
        let texts: Vec<_> = chunks.iter().map(|c| c.text.as_str()).collect();

        let vector_array = build_vector_array(chunks, self.dimension);

        RecordBatch::try_new(
            self.schema(),
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(StringArray::from(doc_ids)),
                Arc::new(StringArray::from(filenames)),
                Arc::new(UInt32Array::from(chunk_indices)),
                Arc::new(StringArray::from(texts)),
                vector_array,
            ],
        )
        .map_err(|e| StoreError::Insert(format!("Failed to create RecordBatch: {e}")))
    }
}

#[async_trait]
impl VectorIndex for LanceIndex {
    async fn init(&self) -> Result<(), StoreError> {
        info!("Initializing LanceDB at {:?}", self.db_path);

        if let Some(parent) = self.db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Init(format!("Failed to create db directory: {e}")))?;
        }

        let conn = self.get_connection().await?;
        let names = conn
            .table_names()
            .execute()
            .await
            .map_err(|e| StoreError::Init(format!("Failed to list tables: {e}")))?;

        // refuse to start against tables written with another embedding model
        for name in &names {
            self.open_table(name).await?;
        }

        info!("LanceDB ready with {} collections", names.len());
        Ok(())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert(&self, collection: &str, chunks: &[EmbeddedChunk]) -> Result<(), StoreError> {
        for chunk in chunks {
            self.check_dimension(chunk.vector.len())?;
        }
        if chunks.is_empty() {
            return Ok(());
        }

        debug!("Upserting {} chunks into {}", chunks.len(), collection);

        let table = self.open_or_create_table(collection).await?;
        let batch = self.chunks_to_batch(chunks)?;
        let schema = batch.schema();
        let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);

        let mut merge = table.merge_insert(&["id"]);
        merge
            .when_matched_update_all(None)
            .when_not_matched_insert_all();
        merge
            .execute(Box::new(batches))
            .await
            .map_err(|e| StoreError::Insert(format!("Failed to upsert chunks: {e}")))?;

        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Option<Vec<SearchHit>>, StoreError> {
        self.check_dimension(embedding.len())?;

        let Some(table) = self.open_table(collection).await? else {
            return Ok(None);
        };
        if limit == 0 {
            return Ok(Some(Vec::new()));
        }

        let mut results = table
            .vector_search(embedding.to_vec())
            .map_err(|e| StoreError::Query(format!("Failed to create search query: {e}")))?
            .distance_type(DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .map_err(|e| StoreError::Query(format!("Failed to execute search: {e}")))?;

        let mut hits = Vec::new();
        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| StoreError::Query(format!("Failed to fetch results: {e}")))?
        {
            hits.extend(batch_to_hits(&batch)?);
        }

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit);

        debug!("Found {} results in {}", hits.len(), collection);
        Ok(Some(hits))
    }

    async fn delete_by_doc(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> Result<Option<u64>, StoreError> {
        let Some(table) = self.open_table(collection).await? else {
            return Ok(None);
        };

        let filter = format!("doc_id = '{}'", doc_id.replace('\'', "''"));
        let matching = table
            .count_rows(Some(filter.clone()))
            .await
            .map_err(|e| StoreError::Query(format!("Failed to count chunks: {e}")))?;
        if matching > 0 {
            table
                .delete(&filter)
                .await
                .map_err(|e| StoreError::Delete(format!("Failed to delete chunks: {e}")))?;
        }

        debug!("Deleted {} chunks of {} from {}", matching, doc_id, collection);
        Ok(Some(matching as u64))
    }

    async fn count(&self, collection: &str) -> Result<Option<u64>, StoreError> {
        let Some(table) = self.open_table(collection).await? else {
            return Ok(None);
        };

        let rows = table
            .count_rows(None)
            .await
            .map_err(|e| StoreError::Query(format!("Failed to count rows: {e}")))?;
        Ok(Some(rows as u64))
    }

    async fn purge(&self, collection: &str) -> Result<Option<u64>, StoreError> {
        let Some(table) = self.open_table(collection).await? else {
            return Ok(None);
        };

        let rows = table
            .count_rows(None)
            .await
            .map_err(|e| StoreError::Query(format!("Failed to count rows: {e}")))?;
        if rows > 0 {
            table
                .delete("true")
                .await
                .map_err(|e| StoreError::Delete(format!("Failed to purge {collection}: {e}")))?;
        }

        info!("Purged {} chunks from {}", rows, collection);
        Ok(Some(rows as u64))
    }
}

fn build_vector_array(chunks: &[EmbeddedChunk], dim: usize) -> ArrayRef {
    let mut builder = FixedSizeListBuilder::new(Float32Builder::new(), dim as i32);

    for chunk in chunks {
        builder.values().append_slice(&chunk.vector);
        builder.append(true);
    }

    Arc::new(builder.finish())
}

fn batch_to_hits(batch: &RecordBatch) -> Result<Vec<SearchHit>, StoreError> {
    let string_column = |name: &str| {
        batch
            .column_by_name(name)
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
    };

    let ids = string_column("id");
    let doc_ids = string_column("doc_id");
    let filenames = string_column("filename");
    let texts = string_column("text");
    let chunk_indices = batch
        .column_by_name("chunk_index")
        .and_then(|c| c.as_any().downcast_ref::<UInt32Array>());
    let distances = batch
        .column_by_name("_distance")
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

    let (Some(ids), Some(doc_ids), Some(filenames), Some(texts), Some(chunk_indices)) =
        (ids, doc_ids, filenames, texts, chunk_indices)
    else {
        return Err(StoreError::Query("Missing required columns".to_string()));
    };

    let mut hits = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let distance = match distances {
            Some(d) if !d.is_null(i) => d.value(i),
            _ => return Err(StoreError::Query("Missing _distance column".to_string())),
        };

        hits.push(SearchHit {
            id: ids.value(i).to_string(),
            text: texts.value(i).to_string(),
            metadata: ChunkMetadata {
                doc_id: doc_ids.value(i).to_string(),
                filename: filenames.value(i).to_string(),
                chunk_index: chunk_indices.value(i),
            },
            distance,
        });
    }

    Ok(hits)
}
