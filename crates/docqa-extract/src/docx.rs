//! DOCX content extractor.
//!
//! A DOCX file is a zip archive; the body lives in `word/document.xml` as a
//! sequence of `w:p` paragraphs whose runs carry `w:t` text nodes.

use async_trait::async_trait;
use docqa_core::{ContentExtractor, ExtractError, FileType};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::{Cursor, Read};
use tracing::debug;

const DOCUMENT_PART: &str = "word/document.xml";

/// Extractor for Office Open XML word documents.
pub struct DocxExtractor;

impl DocxExtractor {
    /// Create a new DOCX extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for DocxExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for DocxExtractor {
    fn file_types(&self) -> &[FileType] {
        &[FileType::Docx]
    }

    async fn extract_bytes(
        &self,
        data: &[u8],
        file_type: FileType,
    ) -> Result<String, ExtractError> {
        if file_type != FileType::Docx {
            return Err(ExtractError::UnsupportedFormat(file_type.to_string()));
        }

        let bytes = data.to_vec();
        let paragraphs = tokio::task::spawn_blocking(move || extract_paragraphs(&bytes))
            .await
            .map_err(|e| ExtractError::Failed(format!("DOCX extraction task failed: {e}")))??;

        debug!("Extracted {} DOCX paragraphs", paragraphs.len());

        if paragraphs.is_empty() {
            return Err(ExtractError::NoText("DOCX has no paragraph text".to_string()));
        }
        Ok(paragraphs.join("\n"))
    }
}

/// Read `word/document.xml` and return its non-empty paragraphs in order.
fn extract_paragraphs(data: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))
        .map_err(|e| ExtractError::Parse(format!("not a DOCX archive: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| ExtractError::Parse(format!("missing {DOCUMENT_PART}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::Parse(format!("unreadable {DOCUMENT_PART}: {e}")))?;

    paragraphs_from_xml(&xml)
}

fn paragraphs_from_xml(xml: &str) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    // nested w:p (text boxes) fold into the outer paragraph
    let mut depth = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:p" => depth += 1,
                b"w:t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" if depth > 0 => current.push('\t'),
                b"w:br" | b"w:cr" if depth > 0 => current.push(' '),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text && depth > 0 => {
                let text = t
                    .unescape()
                    .map_err(|e| ExtractError::Parse(format!("bad DOCX text node: {e}")))?;
                current.push_str(&text);
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        let paragraph = std::mem::take(&mut current);
                        if !paragraph.trim().is_empty() {
                            paragraphs.push(paragraph);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ExtractError::Parse(format!(
                    "malformed {DOCUMENT_PART} at {}: {e}",
                    reader.buffer_position()
                )));
            }
        }
    }

    Ok(paragraphs)
}
