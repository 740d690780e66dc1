//! AWS S3 (and S3-compatible) provider.

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

/// Environment variable lookup, injectable for tests.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";

/// Builds [`S3Provider`] handles.
///
/// Explicit keys win. When either key is missing the builder falls back to
/// `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` from the environment.
pub struct S3Builder {
    env: EnvLookup,
}

impl S3Builder {
    /// Builder reading the process environment.
    #[must_use]
    pub fn new() -> Self {
        Self::with_env(Arc::new(|name| std::env::var(name).ok()))
    }

    /// Builder with a custom environment lookup.
    #[must_use]
    pub fn with_env(env: EnvLookup) -> Self {
        Self { env }
    }

    fn keys(&self, credentials: &ProviderCredentials) -> Option<(String, String)> {
        let explicit = (
            credentials.access_key_id.trim(),
            credentials.secret_access_key.trim(),
        );
        if !explicit.0.is_empty() && !explicit.1.is_empty() {
            return Some((explicit.0.to_string(), explicit.1.to_string()));
        }
        let id = (self.env)(ENV_ACCESS_KEY_ID).filter(|v| !v.trim().is_empty())?;
        let secret = (self.env)(ENV_SECRET_ACCESS_KEY).filter(|v| !v.trim().is_empty())?;
        Some((id, secret))
    }
}

impl Default for S3Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderBuilder for S3Builder {
    fn kind(&self) -> BackendKind {
        BackendKind::S3
    }

    fn build(
        &self,
        _ctx: &ResolutionContext,
        credentials: &ProviderCredentials,
        options: ProviderOptions,
    ) -> Result<Arc<dyn ProviderHandle>, BuildError> {
        let kind = BackendKind::S3;
        let bucket = first_non_empty(&[&options.bucket, &credentials.bucket])
            .ok_or_else(|| BuildError::missing_field(kind, "bucket"))?;
        let region = first_non_empty(&[&options.region, &credentials.region])
            .ok_or_else(|| BuildError::missing_field(kind, "region"))?;
        let (access_key_id, secret_access_key) = self
            .keys(credentials)
            .ok_or(BuildError::MissingCredentials { kind })?;

        let mut builder = services::S3::default()
            .bucket(bucket)
            .region(region)
            .access_key_id(&access_key_id)
            .secret_access_key(&secret_access_key)
            .disable_config_load();
        if let Some(endpoint) = first_non_empty(&[&options.endpoint, &credentials.endpoint]) {
            builder = builder.endpoint(endpoint);
        }
        if !options.base_path.trim().is_empty() {
            builder = builder.root(options.base_path.trim());
        }

        let store = ObjectStore::new(kind, bucket, builder)?;
        tracing::debug!(bucket, region, "built s3 provider");
        Ok(Arc::new(S3Provider { store }))
    }
}

/// Live S3 client.
#[derive(Debug)]
pub struct S3Provider {
    store: ObjectStore,
}

#[async_trait]
impl ProviderHandle for S3Provider {
    fn kind(&self) -> BackendKind {
        BackendKind::S3
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
