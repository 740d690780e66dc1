//! Upload validation and object key generation.

use uuid::Uuid;

use crate::storage::{StorageError, UploadOptions};

/// Limits applied to every upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    /// Maximum file size in bytes.
    pub max_file_size: u64,
    /// Accepted MIME types. Empty accepts everything; `type/*` accepts a family.
    pub allowed_mime_types: Vec<String>,
}

impl UploadPolicy {
    /// Policy with a size limit and no MIME restriction.
    #[must_use]
    pub fn new(max_file_size: u64) -> Self {
        Self {
            max_file_size,
            allowed_mime_types: Vec::new(),
        }
    }

    /// Restrict accepted MIME types.
    #[must_use]
    pub fn with_allowed_mime_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_mime_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Check if a MIME type is allowed.
    #[must_use]
    pub fn is_mime_type_allowed(&self, mime_type: &str) -> bool {
        if self.allowed_mime_types.is_empty() {
            return true;
        }
        let mime_type = mime_type.trim();
        self.allowed_mime_types.iter().any(|allowed| {
            match allowed.strip_suffix("/*") {
                Some(family) => mime_type
                    .split_once('/')
                    .is_some_and(|(head, _)| head.eq_ignore_ascii_case(family)),
                None => allowed.eq_ignore_ascii_case(mime_type),
            }
        })
    }

    /// Validate size and MIME type.
    ///
    /// # Errors
    ///
    /// Returns an error if file size or MIME type is invalid.
    pub fn validate(&self, content_type: &str, size: u64) -> Result<(), StorageError> {
        if size > self.max_file_size {
            return Err(StorageError::file_too_large(size, self.max_file_size));
        }
        if !self.is_mime_type_allowed(content_type) {
            return Err(StorageError::invalid_mime_type(content_type));
        }
        Ok(())
    }
}

/// Folder and key for a new upload.
///
/// Format: `{folder}/{sanitized_filename}`, with a random folder when none
/// is given.
#[must_use]
pub fn storage_key(options: &UploadOptions) -> (String, String) {
    let folder = options
        .folder
        .as_deref()
        .map(|f| f.trim().trim_matches('/'))
        .filter(|f| !f.is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_string);
    let file_name = sanitize_filename(options.file_name.trim());
    let file_name = if file_name.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        file_name
    };
    let key = format!("{folder}/{file_name}");
    (folder, key)
}

/// Sanitize filename for storage key.
///
/// Only allows ASCII alphanumeric characters, dots, hyphens, and underscores.
pub(crate) fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
