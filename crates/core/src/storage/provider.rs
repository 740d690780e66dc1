//! The live-client trait every backend implements.

use std::time::Duration;

use async_trait::async_trait;

use super::error::StorageError;
use super::types::{BackendKind, DownloadedObject, ObjectMetadata, StoredFile, UploadObject};

/// A live client for one storage backend.
///
/// Handles are shared through the client pool, so implementations must be
/// safe to call concurrently.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProviderHandle: Send + Sync {
    /// Backend this handle talks to.
    fn kind(&self) -> BackendKind;

    /// Bucket (or base path) this handle is bound to.
    fn bucket(&self) -> &str;

    /// URI scheme for objects in this backend.
    fn scheme(&self) -> &'static str {
        self.kind().scheme()
    }

    /// Store an object.
    async fn upload(&self, object: UploadObject) -> Result<ObjectMetadata, StorageError>;

    /// Fetch an object.
    async fn download(&self, file: &StoredFile) -> Result<DownloadedObject, StorageError>;

    /// Remove an object. Removing a missing object is not an error.
    async fn delete(&self, file: &StoredFile) -> Result<(), StorageError>;

    /// Whether an object exists.
    async fn exists(&self, file: &StoredFile) -> Result<bool, StorageError>;

    /// List buckets visible to this handle.
    async fn list_buckets(&self) -> Result<Vec<String>, StorageError>;

    /// Verify the backend is reachable with the configured credentials.
    async fn probe(&self) -> Result<(), StorageError>;

    /// Whether [`Self::presigned_url`] is implemented natively.
    fn supports_presign(&self) -> bool {
        false
    }

    /// Mint a backend-native presigned download URL.
    async fn presigned_url(
        &self,
        _file: &StoredFile,
        _expires_in: Duration,
    ) -> Result<String, StorageError> {
        Err(StorageError::PresignNotSupported { kind: self.kind() })
    }

    /// Release resources. Default is a no-op.
    async fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Full URI for a key in a bucket, e.g. `s3://bucket/folder/file`.
pub(crate) fn full_uri(kind: BackendKind, bucket: &str, key: &str) -> String {
    format!("{}{}/{}", kind.scheme(), bucket, key.trim_start_matches('/'))
}
