//! Upload validation ahead of extraction.

use docqa_core::{FileType, UploadError};

/// Default byte ceiling for uploads (20 MiB).
pub const DEFAULT_MAX_BYTES: u64 = 20 * 1024 * 1024;

/// Extension allow-list and size ceiling for incoming files.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    allowed_extensions: Vec<String>,
    max_bytes: u64,
}

impl UploadPolicy {
    /// Build a policy. Extensions are compared case-insensitively with any
    /// leading `.` removed.
    #[must_use]
    pub fn new<I, S>(allowed_extensions: I, max_bytes: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|e| normalize_extension(e.as_ref()))
                .filter(|e| !e.is_empty())
                .collect(),
            max_bytes,
        }
    }

    /// Maximum accepted size in bytes.
    #[must_use]
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Accepted extensions, lower-case without the dot.
    #[must_use]
    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    /// Check a filename and size, returning the file type to extract as.
    ///
    /// The extension is the lower-cased suffix after the last `.`. An allowed
    /// extension that no extractor understands is still rejected.
    pub fn validate(&self, filename: &str, size: u64) -> Result<FileType, UploadError> {
        let extension = extension_of(filename)
            .ok_or_else(|| UploadError::MissingExtension(filename.to_string()))?;

        let file_type = self
            .allowed_extensions
            .iter()
            .any(|allowed| *allowed == extension)
            .then(|| FileType::from_extension(&extension))
            .flatten()
            .ok_or_else(|| UploadError::ExtensionNotAllowed {
                extension: extension.clone(),
                allowed: self.allowed_list(),
            })?;

        if size > self.max_bytes {
            return Err(UploadError::TooLarge {
                size,
                max: self.max_bytes,
            });
        }

        Ok(file_type)
    }

    fn allowed_list(&self) -> String {
        self.allowed_extensions
            .iter()
            .map(|e| format!(".{e}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::new(FileType::ALL.iter().map(FileType::extension), DEFAULT_MAX_BYTES)
    }
}

/// Lower-cased suffix after the last `.`, if any.
#[must_use]
pub fn extension_of(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.trim();
    if ext.is_empty() || ext.contains(['/', '\\']) {
        return None;
    }
    Some(ext.to_lowercase())
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}
