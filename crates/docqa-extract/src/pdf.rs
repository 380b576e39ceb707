//! PDF content extractor.
//!
//! Uses pdf-extract to pull the text layer page by page.

use async_trait::async_trait;
use docqa_core::{ContentExtractor, ExtractError, FileType};
use tracing::debug;

/// Magic bytes every PDF starts with.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Extractor for PDF files.
pub struct PdfExtractor;

impl PdfExtractor {
    /// Create a new PDF extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for PdfExtractor {
    fn file_types(&self) -> &[FileType] {
        &[FileType::Pdf]
    }

    async fn extract_bytes(
        &self,
        data: &[u8],
        file_type: FileType,
    ) -> Result<String, ExtractError> {
        if file_type != FileType::Pdf {
            return Err(ExtractError::UnsupportedFormat(file_type.to_string()));
        }
        if !data.starts_with(PDF_MAGIC) {
            return Err(ExtractError::Parse("missing %PDF- header".to_string()));
        }

        // pdf-extract is CPU bound and may panic on hostile input
        let bytes = data.to_vec();
        let pages = tokio::task::spawn_blocking(move || extract_pdf_pages(&bytes))
            .await
            .map_err(|e| ExtractError::Failed(format!("PDF extraction task failed: {e}")))?
            .map_err(|e| ExtractError::Parse(format!("PDF parsing failed: {e}")))?;

        debug!("Extracted {} PDF pages", pages.len());

        let text = pages.join("\n");
        if text.trim().is_empty() {
            return Err(ExtractError::NoText("PDF has no text layer".to_string()));
        }
        Ok(text)
    }
}

/// Extract per-page text from PDF bytes using pdf-extract.
fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<String>, String> {
    pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| e.to_string())
}
