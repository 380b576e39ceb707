//! Plain text and markdown extractor.

use async_trait::async_trait;
use docqa_core::{ContentExtractor, ExtractError, FileType};

/// Extractor for `.txt` and `.md` documents.
///
/// Bytes are decoded as UTF-8 with invalid sequences replaced by U+FFFD, so this
/// extractor never fails on malformed encoding.
pub struct TextExtractor;

impl TextExtractor {
    /// Create a new text extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for TextExtractor {
    fn file_types(&self) -> &[FileType] {
        &[FileType::Text, FileType::Markdown]
    }

    async fn extract_bytes(
        &self,
        data: &[u8],
        file_type: FileType,
    ) -> Result<String, ExtractError> {
        if !self.file_types().contains(&file_type) {
            return Err(ExtractError::UnsupportedFormat(file_type.to_string()));
        }
        Ok(String::from_utf8_lossy(data).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_extract_utf8() {
        let extractor = TextExtractor::new();
        let text = extractor
            .extract_bytes("héllo wörld".as_bytes(), FileType::Text)
            .await
            .unwrap();
        assert_eq!(text, "héllo wörld");
    }

    #[tokio::test]
    async fn test_extract_markdown_verbatim() {
        let extractor = TextExtractor::new();
        let md = "# Title\n\n- item one\n- item two\n";
        let text = extractor
            .extract_bytes(md.as_bytes(), FileType::Markdown)
            .await
            .unwrap();
        assert_eq!(text, md);
    }

    #[tokio::test]
    async fn test_invalid_utf8_replaced() {
        let extractor = TextExtractor::new();
        let bytes = [b'o', b'k', 0xFF, 0xFE, b'!'];
        let text = extractor
            .extract_bytes(&bytes, FileType::Text)
            .await
            .unwrap();
        assert!(text.starts_with("ok"));
        assert!(text.ends_with('!'));
        assert!(text.contains('\u{FFFD}'));
    }

    #[tokio::test]
    async fn test_rejects_binary_types() {
        let extractor = TextExtractor::new();
        let err = extractor
            .extract_bytes(b"%PDF-1.4", FileType::Pdf)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(ref t) if t == "pdf"));
    }

    #[test]
    fn test_file_types() {
        let extractor = TextExtractor::default();
        assert!(extractor.file_types().contains(&FileType::Text));
        assert!(extractor.file_types().contains(&FileType::Markdown));
        assert!(!extractor.file_types().contains(&FileType::Docx));
    }
}
