//! Local disk provider.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use opendal::services;

use super::first_non_empty;
use crate::context::ResolutionContext;
use crate::storage::builder::ProviderBuilder;
use crate::storage::config::{ProviderCredentials, ProviderOptions};
use crate::storage::error::{BuildError, StorageError};
use crate::storage::object_store::ObjectStore;
use crate::storage::provider::ProviderHandle;
use crate::storage::types::{BackendKind, DownloadedObject, ObjectMetadata, StoredFile, UploadObject};

/// Base path used when none is configured.
pub const DEFAULT_DISK_BASE_PATH: &str = "./tmp/uploads";

/// Builds [`DiskProvider`] handles.
///
/// Creates the base directory if it does not exist.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskBuilder;

impl ProviderBuilder for DiskBuilder {
    fn kind(&self) -> BackendKind {
        BackendKind::Disk
    }

    fn build(
        &self,
        _ctx: &ResolutionContext,
        credentials: &ProviderCredentials,
        options: ProviderOptions,
    ) -> Result<Arc<dyn ProviderHandle>, BuildError> {
        let kind = BackendKind::Disk;
        let base = first_non_empty(&[&options.base_path, &options.bucket, &credentials.bucket])
            .unwrap_or(DEFAULT_DISK_BASE_PATH);

        // The only side effect of any build. Blocking, but it runs once per
        // cache miss under the key's build lock, never per request.
        std::fs::create_dir_all(base).map_err(|source| BuildError::Io { kind, source })?;
        let root = Path::new(base)
            .canonicalize()
            .map_err(|source| BuildError::Io { kind, source })?;
        let root_str = root
            .to_str()
            .ok_or_else(|| BuildError::backend(kind, "base path is not valid UTF-8"))?;

        let store = ObjectStore::new(kind, root_str, services::Fs::default().root(root_str))?;
        let local_url = options.local_url.trim().trim_end_matches('/').to_string();
        tracing::debug!(root = %root.display(), local_url, "built disk provider");

        Ok(Arc::new(DiskProvider {
            store,
            root,
            local_url,
        }))
    }
}

/// Files stored under a local directory.
#[derive(Debug)]
pub struct DiskProvider {
    store: ObjectStore,
    root: PathBuf,
    local_url: String,
}

impl DiskProvider {
    /// Absolute base directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ProviderHandle for DiskProvider {
    fn kind(&self) -> BackendKind {
        BackendKind::Disk
    }

    fn bucket(&self) -> &str {
        self.store.bucket()
    }

    async fn upload(&self, object: UploadObject) -> Result<ObjectMetadata, StorageError> {
        self.store.write(object).await
    }

    async fn download(&self, file: &StoredFile) -> Result<DownloadedObject, StorageError> {
        self.store.read(&file.key).await
    }

    async fn delete(&self, file: &StoredFile) -> Result<(), StorageError> {
        self.store.delete(&file.key).await
    }

    async fn exists(&self, file: &StoredFile) -> Result<bool, StorageError> {
        self.store.exists(&file.key).await
    }

    async fn list_buckets(&self) -> Result<Vec<String>, StorageError> {
        Ok(vec![self.store.bucket().to_string()])
    }

    async fn probe(&self) -> Result<(), StorageError> {
        tokio::fs::metadata(&self.root)
            .await
            .map(|_| ())
            .map_err(|e| StorageError::operation(format!("disk root unavailable: {e}")))
    }

    fn supports_presign(&self) -> bool {
        !self.local_url.is_empty()
    }

    async fn presigned_url(
        &self,
        file: &StoredFile,
        _expires_in: Duration,
    ) -> Result<String, StorageError> {
        if self.local_url.is_empty() {
            return Err(StorageError::PresignNotSupported {
                kind: BackendKind::Disk,
            });
        }
        Ok(format!(
            "{}/{}",
            self.local_url,
            file.key.trim_start_matches('/')
        ))
    }
}
