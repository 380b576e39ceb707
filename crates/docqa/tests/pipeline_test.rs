//! Integration tests for the full docqa pipeline.
//!
//! Tests the complete flow: upload check → extract → chunk → embed → store →
//! retrieve → answer, using the hashing embedder so no model is downloaded.

use async_trait::async_trait;
use docqa_chunker::WordWindowChunker;
use docqa_core::{
    ChunkConfig, DocumentStatus, Error, GenerateError, GenerationRequest, Generator,
    UploadError,
};
use docqa_embed::{EmbedderPool, HashingEmbedder};
use docqa_extract::ExtractorRegistry;
use docqa_index::{
    IndexUpdate, IngestJob, IngestWorker, IngestionService, MemoryStatusSink, UploadPolicy,
    WorkspaceIndex,
};
use docqa_query::{NO_DOCUMENTS_ANSWER, Retriever, RetrieverSettings};
use docqa_store::MemoryIndex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const TEST_DIM: usize = 256;

const ASTRONOMY: &[&str] = &[
    "telescope", "galaxy", "nebula", "orbit", "planet", "comet", "stellar", "quasar",
];
const COOKING: &[&str] = &[
    "flour", "oven", "butter", "recipe", "simmer", "garlic", "pastry", "saucepan",
];

/// Mock generator that echoes how many context sections it received.
struct CountingGenerator {
    calls: AtomicUsize,
}

impl CountingGenerator {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for CountingGenerator {
    fn model_name(&self) -> &str {
        "counting-generator"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let sections = request
            .messages
            .iter()
            .map(|m| m.content.matches("[Source ").count())
            .sum::<usize>();
        Ok(format!("answered from {sections} sections"))
    }
}

/// `words` whitespace-separated words cycling through `vocabulary`.
fn document(vocabulary: &[&str], words: usize) -> String {
    vocabulary
        .iter()
        .cycle()
        .take(words)
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

fn memory_index() -> Arc<WorkspaceIndex> {
    let store = Arc::new(MemoryIndex::new(TEST_DIM));
    let embedder = Arc::new(EmbedderPool::new(
        Arc::new(HashingEmbedder::with_dimension(TEST_DIM)),
        2,
    ));
    Arc::new(WorkspaceIndex::new(store, embedder).unwrap())
}

fn service(index: Arc<WorkspaceIndex>) -> Arc<IngestionService> {
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

fn text_job(workspace_id: &str, doc_id: &str, filename: &str, text: &str) -> IngestJob {
    IngestJob {
        workspace_id: workspace_id.to_string(),
        doc_id: doc_id.to_string(),
        filename: filename.to_string(),
        declared_type: "txt".to_string(),
        bytes: text.as_bytes().to_vec(),
    }
}

#[tokio::test]
async fn test_full_pipeline_ingest_and_answer() {
    let index = memory_index();
    let service = service(Arc::clone(&index));

    // 60 words with size 20 / overlap 5 → windows at 0, 15, 30, 45
    let stored = service
        .ingest(&text_job("team-a", "stars", "stars.txt", &document(ASTRONOMY, 60)))
        .await
        .unwrap();
    assert_eq!(stored, 4);
    service
        .ingest(&text_job("team-a", "bread", "bread.md", &document(COOKING, 60)))
        .await
        .unwrap();
    assert_eq!(index.count("team-a").await.unwrap(), 8);

    let generator = CountingGenerator::new();
    let retriever = Retriever::new(
        Arc::clone(&index),
        generator.clone(),
        RetrieverSettings::default(),
    );

    let answer = retriever
        .answer("team-a", "telescope galaxy nebula orbit", Some(3))
        .await
        .unwrap();

    assert_eq!(answer.answer, "answered from 3 sections");
    assert!(answer.generation_error.is_none());
    assert_eq!(generator.calls(), 1);
    assert_eq!(answer.sources.len(), 3);
    assert_eq!(answer.sources[0].doc_id, "stars");
    assert_eq!(answer.sources[0].filename, "stars.txt");
    assert!(
        answer
            .sources
            .windows(2)
            .all(|pair| pair[0].score >= pair[1].score)
    );
}

#[tokio::test]
async fn test_workspaces_are_isolated() {
    let index = memory_index();
    let service = service(Arc::clone(&index));

    service
        .ingest(&text_job("team-a", "stars", "stars.txt", &document(ASTRONOMY, 60)))
        .await
        .unwrap();
    service
        .ingest(&text_job("team-b", "bread", "bread.txt", &document(COOKING, 60)))
        .await
        .unwrap();

    let results = index.query("team-b", "telescope galaxy", 50).await.unwrap();
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| r.doc_id == "bread"));

    index.purge_workspace("team-a").await.unwrap();
    assert_eq!(index.count("team-a").await.unwrap(), 0);
    assert_eq!(index.count("team-b").await.unwrap(), 4);
}

#[tokio::test]
async fn test_reingest_overwrites_and_delete_counts() {
    let index = memory_index();
    let service = service(Arc::clone(&index));
    let job = text_job("ws", "doc-1", "notes.txt", &document(ASTRONOMY, 60));

    service.ingest(&job).await.unwrap();
    service.ingest(&job).await.unwrap();
    assert_eq!(index.count("ws").await.unwrap(), 4);

    assert_eq!(index.delete_by_document("ws", "doc-1").await.unwrap(), 4);
    assert_eq!(index.delete_by_document("ws", "doc-1").await.unwrap(), 0);
    assert_eq!(index.delete_by_document("never-used", "doc-1").await.unwrap(), 0);
    assert_eq!(index.count("ws").await.unwrap(), 0);
}

#[tokio::test]
async fn test_empty_workspace_gets_canned_answer() {
    let generator = CountingGenerator::new();
    let retriever = Retriever::new(memory_index(), generator.clone(), RetrieverSettings::default());

    let answer = retriever.answer("nobody", "anything?", None).await.unwrap();
    assert_eq!(answer.answer, NO_DOCUMENTS_ANSWER);
    assert!(answer.sources.is_empty());
    assert_eq!(generator.calls(), 0);

    let err = retriever.answer("nobody", "  ", None).await.unwrap_err();
    assert!(matches!(err, Error::InvalidQuery(_)));
}

#[tokio::test]
async fn test_tiny_document_is_ready_with_no_chunks() {
    let index = memory_index();
    let stored = service(Arc::clone(&index))
        .ingest(&text_job("ws", "tiny", "tiny.txt", "too short"))
        .await
        .unwrap();

    assert_eq!(stored, 0);
    assert_eq!(index.count("ws").await.unwrap(), 0);
}

#[tokio::test]
async fn test_worker_reports_status_transitions() {
    let index = memory_index();
    let sink = Arc::new(MemoryStatusSink::new());
    let worker = IngestWorker::spawn(service(Arc::clone(&index)), sink.clone(), 4);
    let mut updates = worker.subscribe();

    let ack = worker
        .submit(text_job("ws", "good", "good.txt", &document(COOKING, 60)))
        .await
        .unwrap();
    assert_eq!(ack.status, DocumentStatus::Processing);

    worker
        .submit(IngestJob {
            workspace_id: "ws".to_string(),
            doc_id: "bad".to_string(),
            filename: "broken.pdf".to_string(),
            declared_type: "pdf".to_string(),
            bytes: b"this is not a pdf".to_vec(),
        })
        .await
        .unwrap();

    let mut terminal = Vec::new();
    while terminal.len() < 2 {
        match updates.recv().await.unwrap() {
            update @ (IndexUpdate::DocumentIndexed { .. } | IndexUpdate::DocumentFailed { .. }) => {
                terminal.push(update);
            }
            _ => {}
        }
    }
    worker.shutdown().await.unwrap();

    assert_eq!(
        terminal[0],
        IndexUpdate::DocumentIndexed {
            workspace_id: "ws".to_string(),
            doc_id: "good".to_string(),
            chunk_count: 4,
        }
    );
    assert!(matches!(&terminal[1], IndexUpdate::DocumentFailed { doc_id, .. } if doc_id == "bad"));

    let good = sink.latest("good").await.unwrap();
    assert_eq!(good.status, DocumentStatus::Ready);
    assert_eq!(good.chunk_count, 4);

    let bad = sink.latest("bad").await.unwrap();
    assert_eq!(bad.status, DocumentStatus::Error);
    assert!(bad.error_message.is_some());
    assert_eq!(index.count("ws").await.unwrap(), 4);

    let statuses: Vec<_> = sink
        .reports()
        .await
        .into_iter()
        .filter(|r| r.doc_id == "good")
        .map(|r| r.status)
        .collect();
    assert_eq!(statuses, vec![DocumentStatus::Processing, DocumentStatus::Ready]);
}

#[test]
fn test_upload_policy_gate() {
    let policy = UploadPolicy::default();

    assert!(policy.validate("report.PDF", 1024).is_ok());
    assert!(matches!(
        policy.validate("setup.exe", 1024),
        Err(UploadError::ExtensionNotAllowed { .. })
    ));
    assert!(matches!(
        policy.validate("README", 1024),
        Err(UploadError::MissingExtension(_))
    ));
    assert!(matches!(
        policy.validate("huge.txt", 21 * 1024 * 1024),
        Err(UploadError::TooLarge { .. })
    ));
}

#[test]
fn test_dimension_mismatch_rejected() {
    let store = Arc::new(MemoryIndex::new(TEST_DIM));
    let embedder = Arc::new(EmbedderPool::new(
        Arc::new(HashingEmbedder::with_dimension(TEST_DIM / 2)),
        1,
    ));
    assert!(WorkspaceIndex::new(store, embedder).is_err());
}

#[cfg(feature = "lancedb")]
#[tokio::test]
async fn test_lance_index_persists_across_reopen() {
    use docqa_core::VectorIndex;
    use docqa_store::LanceIndex;
    use tempfile::tempdir;

    let dir = tempdir().unwrap();
    let db_path = dir.path().join("index.lance");
    let embedder = Arc::new(EmbedderPool::new(
        Arc::new(HashingEmbedder::with_dimension(TEST_DIM)),
        2,
    ));

    {
        let store = Arc::new(LanceIndex::new(db_path.clone(), TEST_DIM));
        store.init().await.unwrap();
        let index = Arc::new(WorkspaceIndex::new(store, Arc::clone(&embedder)).unwrap());
        service(Arc::clone(&index))
            .ingest(&text_job("team-a", "stars", "stars.txt", &document(ASTRONOMY, 60)))
            .await
            .unwrap();
    }

    let store = Arc::new(LanceIndex::new(db_path, TEST_DIM));
    store.init().await.unwrap();
    let index = WorkspaceIndex::new(store, embedder).unwrap();

    assert_eq!(index.count("team-a").await.unwrap(), 4);
    let results = index.query("team-a", "comet orbit", 2).await.unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.filename == "stars.txt"));
    assert_eq!(index.delete_by_document("team-a", "stars").await.unwrap(), 4);
}
