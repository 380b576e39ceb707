//! # docqa-extract
//!
//! Content extraction for the docqa ingestion pipeline. Each extractor turns
//! the raw bytes of an uploaded document into a single text string.
//!
//! ## Supported Formats
//!
//! | Extractor | Types | Behaviour |
//! |-----------|-------|-----------|
//! | [`TextExtractor`] | `txt`, `md` | Lossy UTF-8 decoding, never fails |
//! | [`PdfExtractor`] | `pdf` | Per-page text layer joined with newlines |
//! | [`DocxExtractor`] | `docx` | Non-empty paragraphs joined with newlines |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docqa_extract::ExtractorRegistry;
//!
//! let registry = ExtractorRegistry::with_defaults();
//! let text = registry.extract(&bytes, "pdf").await?;
//! ```
//!
//! Extraction failures are terminal for the document: there is no partial
//! fallback, and an unknown type tag fails with
//! [`ExtractError::UnsupportedFormat`](docqa_core::ExtractError::UnsupportedFormat).

pub mod docx;
pub mod pdf;
pub mod registry;
pub mod text;

pub use docx::DocxExtractor;
pub use pdf::PdfExtractor;
pub use registry::ExtractorRegistry;
pub use text::TextExtractor;
