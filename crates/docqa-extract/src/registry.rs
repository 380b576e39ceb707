//! Extractor registry for routing documents to content extractors.

use docqa_core::{ContentExtractor, ExtractError, FileType};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::{DocxExtractor, PdfExtractor, TextExtractor};

/// Registry of content extractors.
pub struct ExtractorRegistry {
    /// Named extractors
    extractors: HashMap<String, Arc<dyn ContentExtractor>>,
    /// File type to extractor name mapping
    type_mapping: HashMap<FileType, String>,
}

impl ExtractorRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            extractors: HashMap::new(),
            type_mapping: HashMap::new(),
        }
    }

    /// Registry with text, markdown, PDF and DOCX extractors.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("text", TextExtractor::new());
        registry.register("pdf", PdfExtractor::new());
        registry.register("docx", DocxExtractor::new());
        registry
    }

    /// Register an extractor. Later registrations win for shared file types.
    pub fn register<E: ContentExtractor + 'static>(&mut self, name: &str, extractor: E) {
        let extractor = Arc::new(extractor);
        for file_type in extractor.file_types() {
            self.type_mapping.insert(*file_type, name.to_string());
        }
        self.extractors.insert(name.to_string(), extractor);
    }

    /// Get the extractor for a file type.
    #[must_use]
    pub fn get_for_type(&self, file_type: FileType) -> Option<Arc<dyn ContentExtractor>> {
        self.type_mapping
            .get(&file_type)
            .and_then(|name| self.extractors.get(name))
            .cloned()
    }

    /// File types with a registered extractor.
    #[must_use]
    pub fn supported_types(&self) -> Vec<FileType> {
        FileType::ALL
            .into_iter()
            .filter(|t| self.type_mapping.contains_key(t))
            .collect()
    }

    /// Extract text from bytes of a declared type tag such as `"pdf"` or `".MD"`.
    pub async fn extract(&self, data: &[u8], declared_type: &str) -> Result<String, ExtractError> {
        let file_type = FileType::from_extension(declared_type)
            .ok_or_else(|| ExtractError::UnsupportedFormat(declared_type.to_string()))?;
        self.extract_typed(data, file_type).await
    }

    /// Extract text from bytes of a known file type.
    pub async fn extract_typed(
        &self,
        data: &[u8],
        file_type: FileType,
    ) -> Result<String, ExtractError> {
        let extractor = self
            .get_for_type(file_type)
            .ok_or_else(|| ExtractError::UnsupportedFormat(file_type.to_string()))?;

        debug!("Extracting {} bytes as {}", data.len(), file_type);
        extractor.extract_bytes(data, file_type).await
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
