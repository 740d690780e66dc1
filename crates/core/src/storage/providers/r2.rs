//! Cloudflare R2 provider.

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

/// Region R2 expects in SigV4 requests.
pub const R2_REGION: &str = "auto";

/// R2 endpoint for an account.
#[must_use]
pub fn r2_endpoint(account_id: &str) -> String {
    format!("https://{account_id}.r2.cloudflarestorage.com")
}

/// Builds [`R2Provider`] handles.
#[derive(Debug, Default, Clone, Copy)]
pub struct R2Builder;

impl ProviderBuilder for R2Builder {
    fn kind(&self) -> BackendKind {
        BackendKind::R2
    }

    fn build(
        &self,
        _ctx: &ResolutionContext,
        credentials: &ProviderCredentials,
        options: ProviderOptions,
    ) -> Result<Arc<dyn ProviderHandle>, BuildError> {
        let kind = BackendKind::R2;
        let bucket = first_non_empty(&[&options.bucket, &credentials.bucket])
            .ok_or_else(|| BuildError::missing_field(kind, "bucket"))?;
        let account_id = first_non_empty(&[&credentials.account_id])
            .ok_or_else(|| BuildError::missing_field(kind, "account_id"))?;
        let access_key_id = first_non_empty(&[&credentials.access_key_id])
            .ok_or_else(|| BuildError::missing_field(kind, "access_key_id"))?;
        let secret_access_key = first_non_empty(&[&credentials.secret_access_key])
            .ok_or_else(|| BuildError::missing_field(kind, "secret_access_key"))?;

        let endpoint = first_non_empty(&[&options.endpoint, &credentials.endpoint])
            .map_or_else(|| r2_endpoint(account_id), str::to_string);
        let region = first_non_empty(&[&options.region, &credentials.region]).unwrap_or(R2_REGION);

        let mut builder = services::S3::default()
            .bucket(bucket)
            .region(region)
            .endpoint(&endpoint)
            .access_key_id(access_key_id)
            .secret_access_key(secret_access_key)
            .disable_config_load();
        if !options.base_path.trim().is_empty() {
            builder = builder.root(options.base_path.trim());
        }

        let store = ObjectStore::new(kind, bucket, builder)?;
        tracing::debug!(bucket, %endpoint, "built r2 provider");
        Ok(Arc::new(R2Provider { store, endpoint }))
    }
}

/// Live R2 client.
#[derive(Debug)]
pub struct R2Provider {
    store: ObjectStore,
    endpoint: String,
}

impl R2Provider {
    /// Endpoint the client talks to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ProviderHandle for R2Provider {
    fn kind(&self) -> BackendKind {
        BackendKind::R2
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
        self.store.check().await
    }

    fn supports_presign(&self) -> bool {
        true
    }

    async fn presigned_url(
        &self,
        file: &StoredFile,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        self.store.presign_read(&file.key, expires_in).await
    }
}
