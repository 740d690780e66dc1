//! OpenDAL-backed object store shared by the S3, R2 and disk handles.

use std::time::Duration;

use chrono::Utc;
use opendal::{ErrorKind, Operator};

use super::error::{BuildError, StorageError, from_opendal};
use super::provider::full_uri;
use super::types::{BackendKind, DownloadedObject, ObjectMetadata, UploadObject};

/// A thin wrapper over an OpenDAL [`Operator`] bound to one bucket.
#[derive(Clone, Debug)]
pub(crate) struct ObjectStore {
    kind: BackendKind,
    bucket: String,
    operator: Operator,
}

impl ObjectStore {
    /// Finish an OpenDAL service builder into a store.
    pub(crate) fn new<B: opendal::Builder>(
        kind: BackendKind,
        bucket: impl Into<String>,
        builder: B,
    ) -> Result<Self, BuildError> {
        let operator = Operator::new(builder)
            .map_err(|e| BuildError::backend(kind, e.to_string()))?
            .finish();
        Ok(Self {
            kind,
            bucket: bucket.into(),
            operator,
        })
    }

    pub(crate) fn bucket(&self) -> &str {
        &self.bucket
    }

    pub(crate) async fn write(&self, object: UploadObject) -> Result<ObjectMetadata, StorageError> {
        let size = object.data.len() as u64;
        let mut write = self.operator.write_with(&object.key, object.data);
        // fs rejects content types
        if self.operator.info().full_capability().write_with_content_type {
            write = write.content_type(&object.content_type);
        }
        write
            .await
            .map_err(|e| from_opendal(self.kind, &object.key, &e))?;

        Ok(ObjectMetadata {
            provider: self.kind,
            bucket: self.bucket.clone(),
            full_uri: full_uri(self.kind, &self.bucket, &object.key),
            key: object.key,
            size,
            content_type: object.content_type,
            uploaded_at: Utc::now(),
        })
    }

    pub(crate) async fn read(&self, key: &str) -> Result<DownloadedObject, StorageError> {
        let buffer = self
            .operator
            .read(key)
            .await
            .map_err(|e| from_opendal(self.kind, key, &e))?;
        Ok(DownloadedObject::new(buffer.to_bytes()))
    }

    pub(crate) async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.operator
            .delete(key)
            .await
            .map_err(|e| from_opendal(self.kind, key, &e))
    }

    pub(crate) async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        match self.operator.stat(key).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(from_opendal(self.kind, key, &e)),
        }
    }

    pub(crate) async fn presign_read(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let presigned = self
            .operator
            .presign_read(key, expires_in)
            .await
            .map_err(|e| from_opendal(self.kind, key, &e))?;
        Ok(presigned.uri().to_string())
    }

    pub(crate) async fn check(&self) -> Result<(), StorageError> {
        self.operator
            .check()
            .await
            .map_err(|e| StorageError::operation(format!("{} probe failed: {e}", self.kind)))
    }
}
