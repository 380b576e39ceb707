//! Status sinks for document lifecycle reports.

use async_trait::async_trait;
use docqa_core::{DocumentReport, DocumentStatus, StatusSink};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Keeps every report in memory, in arrival order.
#[derive(Default)]
pub struct MemoryStatusSink {
    reports: RwLock<Vec<DocumentReport>>,
}

impl MemoryStatusSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All reports received so far.
    pub async fn reports(&self) -> Vec<DocumentReport> {
        self.reports.read().await.clone()
    }

    /// Most recent report for a document.
    pub async fn latest(&self, doc_id: &str) -> Option<DocumentReport> {
        self.reports
            .read()
            .await
            .iter()
            .rev()
            .find(|r| r.doc_id == doc_id)
            .cloned()
    }
}

#[async_trait]
impl StatusSink for MemoryStatusSink {
    async fn report(&self, report: &DocumentReport) {
        self.reports.write().await.push(report.clone());
    }
}

/// Writes reports to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogStatusSink;

#[async_trait]
impl StatusSink for LogStatusSink {
    async fn report(&self, report: &DocumentReport) {
        match report.status {
            DocumentStatus::Error => warn!(
                "{} ({}) in {}: error: {}",
                report.filename,
                report.doc_id,
                report.workspace_id,
                report.error_message.as_deref().unwrap_or("unknown")
            ),
            status => info!(
                "{} ({}) in {}: {} ({} chunks)",
                report.filename, report.doc_id, report.workspace_id, status, report.chunk_count
            ),
        }
    }
}
