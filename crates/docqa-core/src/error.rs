//! Error types for docqa.

use thiserror::Error;

/// Main error type for docqa operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Content extraction failed
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractError),

    /// Chunking failed
    #[error("chunking error: {0}")]
    Chunking(#[from] ChunkError),

    /// Embedding generation failed
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbedError),

    /// Vector index operation failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Answer generation failed
    #[error("generation error: {0}")]
    Generation(#[from] GenerateError),

    /// Upload rejected before extraction
    #[error("upload rejected: {0}")]
    Upload(#[from] UploadError),

    /// Caller supplied a query that cannot be answered
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Content extraction errors.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("no extractable text: {0}")]
    NoText(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("extraction failed: {0}")]
    Failed(String),
}

/// Chunking errors.
#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("chunking failed: {0}")]
    Failed(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Embedding errors.
#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("model loading failed: {0}")]
    ModelLoad(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

/// Vector index errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store initialization failed: {0}")]
    Init(String),

    #[error("insert failed: {0}")]
    Insert(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("delete failed: {0}")]
    Delete(String),

    #[error("dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Errors raised by the chat-completion collaborator.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("no API key configured for generation endpoint")]
    MissingApiKey,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("generation timed out after {0}s")]
    Timeout(u64),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Upload validation errors.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("file has no extension: {0}")]
    MissingExtension(String),

    #[error("extension '.{extension}' not allowed (allowed: {allowed})")]
    ExtensionNotAllowed { extension: String, allowed: String },

    #[error("file is {size} bytes, limit is {max} bytes")]
    TooLarge { size: u64, max: u64 },
}

/// Result type alias for docqa operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    // ========== ExtractError Tests ==========

    #[test]
    fn test_extract_error_unsupported_format_names_type() {
        let err = ExtractError::UnsupportedFormat("exe".to_string());
        assert_eq!(err.to_string(), "unsupported file type: exe");
    }

    #[test]
    fn test_extract_error_no_text_display() {
        let err = ExtractError::NoText("pdf has no text layer".to_string());
        assert_eq!(err.to_string(), "no extractable text: pdf has no text layer");
    }

    #[test]
    fn test_extract_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: ExtractError = io_err.into();
        assert!(matches!(err, ExtractError::Io(_)));
    }

    // ========== StoreError Tests ==========

    #[test]
    fn test_store_error_dimension_mismatch_display() {
        let err = StoreError::DimensionMismatch {
            expected: 384,
            actual: 768,
        };
        assert_eq!(
            err.to_string(),
            "dimension mismatch: index expects 384, got 768"
        );
    }

    #[test]
    fn test_store_error_delete_display() {
        let err = StoreError::Delete("table locked".to_string());
        assert_eq!(err.to_string(), "delete failed: table locked");
    }

    // ========== GenerateError Tests ==========

    #[test]
    fn test_generate_error_api_display() {
        let err = GenerateError::Api {
            status: 429,
            body: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "API returned 429: rate limited");
    }

    #[test]
    fn test_generate_error_timeout_display() {
        let err = GenerateError::Timeout(30);
        assert_eq!(err.to_string(), "generation timed out after 30s");
    }

    // ========== UploadError Tests ==========

    #[test]
    fn test_upload_error_not_allowed_lists_allowed() {
        let err = UploadError::ExtensionNotAllowed {
            extension: "exe".to_string(),
            allowed: "pdf, txt, md, docx".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "extension '.exe' not allowed (allowed: pdf, txt, md, docx)"
        );
    }

    #[test]
    fn test_upload_error_too_large_display() {
        let err = UploadError::TooLarge { size: 30, max: 20 };
        assert_eq!(err.to_string(), "file is 30 bytes, limit is 20 bytes");
    }

    // ========== Main Error Tests ==========

    #[test]
    fn test_error_from_extract_error() {
        let err: Error = ExtractError::UnsupportedFormat("video".to_string()).into();
        assert!(matches!(err, Error::Extraction(_)));
        assert!(err.to_string().contains("video"));
    }

    #[test]
    fn test_error_from_store_error() {
        let err: Error = StoreError::Query("timeout".to_string()).into();
        assert!(matches!(err, Error::Store(_)));
    }

    #[test]
    fn test_error_from_generate_error() {
        let err: Error = GenerateError::MissingApiKey.into();
        assert!(matches!(err, Error::Generation(_)));
        assert!(err.to_string().starts_with("generation error"));
    }

    #[test]
    fn test_error_from_upload_error() {
        let err: Error = UploadError::MissingExtension("README".to_string()).into();
        assert!(matches!(err, Error::Upload(_)));
    }

    #[test]
    fn test_error_invalid_query_display() {
        let err = Error::InvalidQuery("query is empty".to_string());
        assert_eq!(err.to_string(), "invalid query: query is empty");
    }

    #[test]
    fn test_error_chain_io_to_extract_to_main() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file.txt not found");
        let extract_err: ExtractError = io_err.into();
        let main_err: Error = extract_err.into();

        assert!(matches!(main_err, Error::Extraction(ExtractError::Io(_))));
        assert!(main_err.to_string().contains("extraction error"));
    }
}
