//! Storage error types.

use thiserror::Error;

use super::types::BackendKind;
use crate::persistence::PersistenceError;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// File size exceeds maximum allowed.
    #[error("file size {size} bytes exceeds maximum allowed {max} bytes")]
    FileTooLarge {
        /// Actual file size.
        size: u64,
        /// Maximum allowed size.
        max: u64,
    },

    /// MIME type not allowed.
    #[error("MIME type '{mime_type}' is not allowed")]
    InvalidMimeType {
        /// The rejected MIME type.
        mime_type: String,
    },

    /// Object not found in the backend.
    #[error("file not found: {key}")]
    NotFound {
        /// Key that was not found.
        key: String,
    },

    /// The backend cannot mint presigned URLs.
    #[error("presign not supported by {kind} storage")]
    PresignNotSupported {
        /// Backend that refused.
        kind: BackendKind,
    },

    /// Provider configuration error.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// Backend operation error.
    #[error("storage operation failed: {0}")]
    Operation(String),

    /// Invalid storage key format.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// A backend dependency was not wired at build time.
    #[error("{kind} storage client is unavailable")]
    ClientUnavailable {
        /// Backend missing its dependency.
        kind: BackendKind,
    },

    /// Persistence layer failure.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl StorageError {
    /// Create a file too large error.
    #[must_use]
    pub fn file_too_large(size: u64, max: u64) -> Self {
        Self::FileTooLarge { size, max }
    }

    /// Create an invalid MIME type error.
    #[must_use]
    pub fn invalid_mime_type(mime_type: impl Into<String>) -> Self {
        Self::InvalidMimeType {
            mime_type: mime_type.into(),
        }
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an operation error.
    #[must_use]
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }

    /// Whether the error means the object does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Persistence(PersistenceError::NotFound(_))
        )
    }
}

/// Map an OpenDAL error for the given key.
pub(crate) fn from_opendal(kind: BackendKind, key: &str, err: &opendal::Error) -> StorageError {
    match err.kind() {
        opendal::ErrorKind::NotFound => StorageError::not_found(key),
        opendal::ErrorKind::Unsupported => StorageError::PresignNotSupported { kind },
        _ => StorageError::Operation(err.to_string()),
    }
}

/// Errors raised while constructing a provider handle.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A required field was empty.
    #[error("{kind} provider requires `{field}`")]
    MissingField {
        /// Backend being built.
        kind: BackendKind,
        /// Name of the missing field.
        field: &'static str,
    },

    /// No credentials were supplied or discoverable.
    #[error("{kind} provider has no credentials")]
    MissingCredentials {
        /// Backend being built.
        kind: BackendKind,
    },

    /// The backend SDK rejected the configuration.
    #[error("failed to build {kind} provider: {message}")]
    Backend {
        /// Backend being built.
        kind: BackendKind,
        /// SDK error message.
        message: String,
    },

    /// Filesystem error while preparing a disk root.
    #[error("failed to prepare {kind} provider root: {source}")]
    Io {
        /// Backend being built.
        kind: BackendKind,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// Create a missing field error.
    #[must_use]
    pub fn missing_field(kind: BackendKind, field: &'static str) -> Self {
        Self::MissingField { kind, field }
    }

    /// Create a backend SDK error.
    #[must_use]
    pub fn backend(kind: BackendKind, message: impl Into<String>) -> Self {
        Self::Backend {
            kind,
            message: message.into(),
        }
    }
}
