//! Document ingestion: extract → chunk → embed → upsert.
//!
//! [`IngestionService`] runs the pipeline for one document. [`IngestWorker`]
//! owns a queue and a background task so callers can acknowledge an upload
//! as `processing` and observe completion through a [`StatusSink`] and the
//! [`IndexUpdate`] broadcast.

use chrono::Utc;
use docqa_core::{
    ChunkConfig, Chunker, DocumentReport, DocumentStatus, Error, Result, StatusSink,
};
use docqa_extract::ExtractorRegistry;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::workspace::WorkspaceIndex;

/// Index update events.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexUpdate {
    IngestionStarted {
        workspace_id: String,
        doc_id: String,
    },
    DocumentIndexed {
        workspace_id: String,
        doc_id: String,
        chunk_count: u32,
    },
    DocumentFailed {
        workspace_id: String,
        doc_id: String,
        error: String,
    },
    DocumentRemoved {
        workspace_id: String,
        doc_id: String,
        chunk_count: u64,
    },
}

/// One uploaded document awaiting ingestion.
#[derive(Debug, Clone)]
pub struct IngestJob {
    pub workspace_id: String,
    pub doc_id: String,
    pub filename: String,
    /// Type tag such as `"pdf"`; usually the validated file extension
    pub declared_type: String,
    pub bytes: Vec<u8>,
}

impl IngestJob {
    fn report(&self, status: DocumentStatus) -> DocumentReport {
        DocumentReport {
            doc_id: self.doc_id.clone(),
            workspace_id: self.workspace_id.clone(),
            filename: self.filename.clone(),
            status,
            chunk_count: 0,
            error_message: None,
            updated_at: Utc::now(),
        }
    }
}

/// Runs the ingestion pipeline for single documents.
pub struct IngestionService {
    extractors: Arc<ExtractorRegistry>,
    chunker: Arc<dyn Chunker>,
    chunk_config: ChunkConfig,
    index: Arc<WorkspaceIndex>,
}

impl IngestionService {
    /// Create a service. Fails if `chunk_config` cannot make progress.
    pub fn new(
        extractors: Arc<ExtractorRegistry>,
        chunker: Arc<dyn Chunker>,
        chunk_config: ChunkConfig,
        index: Arc<WorkspaceIndex>,
    ) -> Result<Self> {
        chunk_config.validate()?;
        Ok(Self {
            extractors,
            chunker,
            chunk_config,
            index,
        })
    }

    /// The index this service writes to.
    #[must_use]
    pub fn index(&self) -> &Arc<WorkspaceIndex> {
        &self.index
    }

    /// Ingest one document, returning the number of chunks stored.
    ///
    /// A document whose text yields no chunks stores nothing and returns 0.
    pub async fn ingest(&self, job: &IngestJob) -> Result<u32> {
        let text = self.extractors.extract(&job.bytes, &job.declared_type).await?;
        debug!(
            "Extracted {} chars from {} ({})",
            text.len(),
            job.filename,
            job.doc_id
        );

        let chunks = self.chunker.chunk(&text, &self.chunk_config)?;
        info!("Created {} chunks for {}", chunks.len(), job.filename);
        if chunks.is_empty() {
            return Ok(0);
        }

        self.index
            .upsert(&job.workspace_id, &chunks, &job.doc_id, &job.filename)
            .await
    }

    /// Ingest one document and describe the outcome as a terminal report.
    ///
    /// Never fails: any pipeline error becomes an `Error` report.
    pub async fn process(&self, job: &IngestJob) -> DocumentReport {
        match self.ingest(job).await {
            Ok(chunk_count) => DocumentReport {
                chunk_count,
                ..job.report(DocumentStatus::Ready)
            },
            Err(e) => {
                error!("Failed to ingest {} ({}): {}", job.filename, job.doc_id, e);
                DocumentReport {
                    error_message: Some(e.to_string()),
                    ..job.report(DocumentStatus::Error)
                }
            }
        }
    }
}

/// Process one job on its own task so a panic fails only that document.
async fn run_isolated(service: &Arc<IngestionService>, job: IngestJob) -> DocumentReport {
    let job = Arc::new(job);
    let task_service = Arc::clone(service);
    let task_job = Arc::clone(&job);

    match tokio::spawn(async move { task_service.process(&task_job).await }).await {
        Ok(report) => report,
        Err(e) => {
            error!("Ingestion of {} ({}) aborted: {}", job.filename, job.doc_id, e);
            DocumentReport {
                error_message: Some(format!("ingestion task failed: {e}")),
                ..job.report(DocumentStatus::Error)
            }
        }
    }
}

/// Background ingestion queue.
pub struct IngestWorker {
    jobs: mpsc::Sender<IngestJob>,
    updates: broadcast::Sender<IndexUpdate>,
    sink: Arc<dyn StatusSink>,
    service: Arc<IngestionService>,
    handle: JoinHandle<()>,
}

impl IngestWorker {
    /// Spawn the worker task on the current tokio runtime.
    #[must_use]
    pub fn spawn(
        service: Arc<IngestionService>,
        sink: Arc<dyn StatusSink>,
        queue_size: usize,
    ) -> Self {
        let (jobs, mut rx) = mpsc::channel::<IngestJob>(queue_size.max(1));
        let (updates, _) = broadcast::channel(256);

        let worker_service = Arc::clone(&service);
        let worker_sink = Arc::clone(&sink);
        let update_tx = updates.clone();

        let handle = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let _ = update_tx.send(IndexUpdate::IngestionStarted {
                    workspace_id: job.workspace_id.clone(),
                    doc_id: job.doc_id.clone(),
                });

                let report = run_isolated(&worker_service, job).await;
                worker_sink.report(&report).await;

                let update = match report.status {
                    DocumentStatus::Error => IndexUpdate::DocumentFailed {
                        workspace_id: report.workspace_id,
                        doc_id: report.doc_id,
                        error: report.error_message.unwrap_or_default(),
                    },
                    _ => IndexUpdate::DocumentIndexed {
                        workspace_id: report.workspace_id,
                        doc_id: report.doc_id,
                        chunk_count: report.chunk_count,
                    },
                };
                let _ = update_tx.send(update);
            }
            debug!("Ingest worker stopped");
        });

        Self {
            jobs,
            updates,
            sink,
            service,
            handle,
        }
    }

    /// Subscribe to index updates.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<IndexUpdate> {
        self.updates.subscribe()
    }

    /// Queue a document, reporting it as `Processing`.
    ///
    /// Returns the `Processing` report once the job is queued; the terminal
    /// status arrives later through the sink.
    pub async fn submit(&self, job: IngestJob) -> Result<DocumentReport> {
        let report = job.report(DocumentStatus::Processing);
        self.sink.report(&report).await;

        debug!("Queueing {} ({})", job.filename, job.doc_id);
        self.jobs
            .send(job)
            .await
            .map_err(|e| Error::Other(format!("ingest worker stopped: {e}")))?;
        Ok(report)
    }

    /// Remove a document's chunks and announce it.
    pub async fn remove(&self, workspace_id: &str, doc_id: &str) -> Result<u64> {
        let removed = self
            .service
            .index()
            .delete_by_document(workspace_id, doc_id)
            .await?;

        let _ = self.updates.send(IndexUpdate::DocumentRemoved {
            workspace_id: workspace_id.to_string(),
            doc_id: doc_id.to_string(),
            chunk_count: removed,
        });
        Ok(removed)
    }

    /// Stop accepting jobs and wait for queued ones to finish.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.jobs);
        self.handle
            .await
            .map_err(|e| Error::Other(format!("ingest worker panicked: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::MemoryStatusSink;
    use docqa_chunker::WordWindowChunker;
    use docqa_embed::{EmbedderPool, HashingEmbedder};
    use docqa_store::MemoryIndex;

    const TEST_DIM: usize = 64;

    fn service() -> Arc<IngestionService> {
        let store = Arc::new(MemoryIndex::new(TEST_DIM));
        let embedder = Arc::new(EmbedderPool::new(
            Arc::new(HashingEmbedder::with_dimension(TEST_DIM)),
            2,
        ));
        let index = Arc::new(WorkspaceIndex::new(store, embedder).unwrap());

        Arc::new(
            IngestionService::new(
                Arc::new(ExtractorRegistry::with_defaults()),
                Arc::new(WordWindowChunker::new()),
                ChunkConfig::new(20, 5),
                index,
            )
            .unwrap(),
        )
    }

    fn job(doc_id: &str, declared_type: &str, bytes: &[u8]) -> IngestJob {
        IngestJob {
            workspace_id: "ws".to_string(),
            doc_id: doc_id.to_string(),
            filename: format!("{doc_id}.{declared_type}"),
            declared_type: declared_type.to_string(),
            bytes: bytes.to_vec(),
        }
    }

    fn long_text(words: usize) -> String {
        (0..words)
            .map(|i| format!("word{i}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_invalid_chunk_config_rejected() {
        let store = Arc::new(MemoryIndex::new(TEST_DIM));
        let embedder = Arc::new(EmbedderPool::new(
            Arc::new(HashingEmbedder::with_dimension(TEST_DIM)),
            1,
        ));
        let index = Arc::new(WorkspaceIndex::new(store, embedder).unwrap());

        let result = IngestionService::new(
            Arc::new(ExtractorRegistry::with_defaults()),
            Arc::new(WordWindowChunker::new()),
            ChunkConfig::new(10, 10),
            index,
        );
        assert!(matches!(result, Err(Error::Chunking(_))));
    }

    #[tokio::test]
    async fn test_ingest_text_document() {
        let service = service();
        let text = long_text(50);

        let count = service.ingest(&job("d1", "txt", text.as_bytes())).await.unwrap();

        // window starts 0, 15, 30, 45; the 5-word tail is under the length floor
        assert_eq!(count, 3);
        assert_eq!(service.index().count("ws").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_reingest_is_idempotent() {
        let service = service();
        let text = long_text(50);
        let doc = job("d1", "md", text.as_bytes());

        service.ingest(&doc).await.unwrap();
        service.ingest(&doc).await.unwrap();

        assert_eq!(service.index().count("ws").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_short_document_yields_zero_chunks() {
        let service = service();
        let report = service.process(&job("d1", "txt", b"too short")).await;

        assert_eq!(report.status, DocumentStatus::Ready);
        assert_eq!(report.chunk_count, 0);
        assert_eq!(service.index().count("ws").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_bad_pdf_reports_error() {
        let service = service();
        let report = service.process(&job("d1", "pdf", b"not a pdf")).await;

        assert_eq!(report.status, DocumentStatus::Error);
        assert!(report.error_message.is_some());
        assert_eq!(report.chunk_count, 0);
    }

    #[tokio::test]
    async fn test_unknown_type_reports_unsupported() {
        let service = service();
        let report = service.process(&job("d1", "exe", b"MZ")).await;

        assert_eq!(report.status, DocumentStatus::Error);
        assert!(report.error_message.unwrap().contains("exe"));
    }

    #[tokio::test]
    async fn test_worker_status_transitions() {
        let sink = Arc::new(MemoryStatusSink::new());
        let worker = IngestWorker::spawn(service(), sink.clone(), 8);
        let mut updates = worker.subscribe();

        let text = long_text(50);
        let ack = worker.submit(job("good", "txt", text.as_bytes())).await.unwrap();
        assert_eq!(ack.status, DocumentStatus::Processing);
        worker.submit(job("bad", "pdf", b"garbage")).await.unwrap();

        let mut seen = Vec::new();
        while seen.len() < 4 {
            seen.push(updates.recv().await.unwrap());
        }
        worker.shutdown().await.unwrap();

        assert!(seen.contains(&IndexUpdate::DocumentIndexed {
            workspace_id: "ws".to_string(),
            doc_id: "good".to_string(),
            chunk_count: 3,
        }));
        assert!(seen.iter().any(|u| matches!(
            u,
            IndexUpdate::DocumentFailed { doc_id, .. } if doc_id == "bad"
        )));

        let statuses: Vec<_> = sink
            .reports()
            .await
            .into_iter()
            .filter(|r| r.doc_id == "good")
            .map(|r| r.status)
            .collect();
        assert_eq!(statuses, vec![DocumentStatus::Processing, DocumentStatus::Ready]);
        assert_eq!(
            sink.latest("bad").await.map(|r| r.status),
            Some(DocumentStatus::Error)
        );
    }

    struct PanickingChunker;

    impl Chunker for PanickingChunker {
        fn name(&self) -> &str {
            "panicking"
        }

        fn chunk(
            &self,
            _text: &str,
            _config: &ChunkConfig,
        ) -> std::result::Result<Vec<docqa_core::Chunk>, docqa_core::ChunkError> {
            panic!("chunker blew up")
        }
    }

    #[tokio::test]
    async fn test_worker_survives_panicking_job() {
        let healthy = service();
        let panicking = Arc::new(
            IngestionService::new(
                Arc::new(ExtractorRegistry::with_defaults()),
                Arc::new(PanickingChunker),
                ChunkConfig::new(20, 5),
                Arc::clone(healthy.index()),
            )
            .unwrap(),
        );

        let sink = Arc::new(MemoryStatusSink::new());
        let worker = IngestWorker::spawn(panicking, sink.clone(), 4);
        let mut updates = worker.subscribe();

        let text = long_text(50);
        worker.submit(job("first", "txt", text.as_bytes())).await.unwrap();
        worker.submit(job("second", "txt", text.as_bytes())).await.unwrap();

        let mut failed = Vec::new();
        while failed.len() < 2 {
            if let IndexUpdate::DocumentFailed { doc_id, error, .. } =
                updates.recv().await.unwrap()
            {
                assert!(error.contains("ingestion task failed"));
                failed.push(doc_id);
            }
        }
        worker.shutdown().await.unwrap();

        assert_eq!(failed, vec!["first".to_string(), "second".to_string()]);
        let report = sink.latest("first").await.unwrap();
        assert_eq!(report.status, DocumentStatus::Error);
        assert_eq!(report.chunk_count, 0);
    }

    #[tokio::test]
    async fn test_worker_remove_broadcasts() {
        let service = service();
        service
            .ingest(&job("d1", "txt", long_text(30).as_bytes()))
            .await
            .unwrap();

        let worker = IngestWorker::spawn(service, Arc::new(MemoryStatusSink::new()), 1);
        let mut updates = worker.subscribe();

        let removed = worker.remove("ws", "d1").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(
            updates.recv().await.unwrap(),
            IndexUpdate::DocumentRemoved {
                workspace_id: "ws".to_string(),
                doc_id: "d1".to_string(),
                chunk_count: 2,
            }
        );
        worker.shutdown().await.unwrap();
    }
}
