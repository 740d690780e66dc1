//! Database-backed provider storing object bytes through the persistence client.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::context::ResolutionContext;
use crate::persistence::{PersistenceClient, PersistenceSlot, StoredObject};
use crate::storage::builder::ProviderBuilder;
use crate::storage::config::{ProviderCredentials, ProviderOptions};
use crate::storage::error::{BuildError, StorageError};
use crate::storage::provider::{ProviderHandle, full_uri};
use crate::storage::types::{BackendKind, DownloadedObject, ObjectMetadata, StoredFile, UploadObject};

use super::first_non_empty;

/// Logical bucket used when none is configured.
const DEFAULT_DATABASE_BUCKET: &str = "files";

/// Builds [`DatabaseProvider`] handles.
///
/// Takes the persistence client, or the slot it will be installed into, from
/// the resolution context. A missing client does not fail the build; the
/// handle reads the slot on every call and fails while it is empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct DatabaseBuilder;

impl ProviderBuilder for DatabaseBuilder {
    fn kind(&self) -> BackendKind {
        BackendKind::Database
    }

    fn build(
        &self,
        ctx: &ResolutionContext,
        credentials: &ProviderCredentials,
        options: ProviderOptions,
    ) -> Result<Arc<dyn ProviderHandle>, BuildError> {
        let bucket = first_non_empty(&[&options.bucket, &credentials.bucket])
            .unwrap_or(DEFAULT_DATABASE_BUCKET)
            .to_string();
        let persistence = match (ctx.persistence(), ctx.persistence_slot()) {
            (Some(client), _) => Arc::new(PersistenceSlot::with_client(Arc::clone(client))),
            (None, Some(slot)) => Arc::clone(slot),
            (None, None) => Arc::new(PersistenceSlot::new()),
        };
        if persistence.get().is_none() {
            tracing::warn!(bucket, "database provider built before a persistence client was installed");
        }
        Ok(Arc::new(DatabaseProvider {
            bucket,
            persistence,
        }))
    }
}

/// Object bytes kept in the host database.
pub struct DatabaseProvider {
    bucket: String,
    persistence: Arc<PersistenceSlot>,
}

impl DatabaseProvider {
    fn client(&self) -> Result<Arc<dyn PersistenceClient>, StorageError> {
        self.persistence
            .get()
            .ok_or(StorageError::ClientUnavailable {
                kind: BackendKind::Database,
            })
    }
}

impl std::fmt::Debug for DatabaseProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseProvider")
            .field("bucket", &self.bucket)
            .field("persistence", &self.persistence)
            .finish()
    }
}

#[async_trait]
impl ProviderHandle for DatabaseProvider {
    fn kind(&self) -> BackendKind {
        BackendKind::Database
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn upload(&self, object: UploadObject) -> Result<ObjectMetadata, StorageError> {
        let client = self.client()?;
        let size = object.data.len() as u64;
        let uploaded_at = Utc::now();
        client
            .put_object(
                &self.bucket,
                &object.key,
                StoredObject {
                    content_type: object.content_type.clone(),
                    data: object.data,
                    stored_at: uploaded_at,
                },
            )
            .await?;

        Ok(ObjectMetadata {
            provider: BackendKind::Database,
            bucket: self.bucket.clone(),
            full_uri: full_uri(BackendKind::Database, &self.bucket, &object.key),
            key: object.key,
            size,
            content_type: object.content_type,
            uploaded_at,
        })
    }

    async fn download(&self, file: &StoredFile) -> Result<DownloadedObject, StorageError> {
        let object = self
            .client()?
            .get_object(&self.bucket, &file.key)
            .await?
            .ok_or_else(|| StorageError::not_found(&file.key))?;
        Ok(DownloadedObject::new(object.data))
    }

    async fn delete(&self, file: &StoredFile) -> Result<(), StorageError> {
        Ok(self.client()?.delete_object(&self.bucket, &file.key).await?)
    }

    async fn exists(&self, file: &StoredFile) -> Result<bool, StorageError> {
        Ok(self.client()?.object_exists(&self.bucket, &file.key).await?)
    }

    async fn list_buckets(&self) -> Result<Vec<String>, StorageError> {
        self.client()?;
        Ok(vec![self.bucket.clone()])
    }

    async fn probe(&self) -> Result<(), StorageError> {
        Ok(self.client()?.ping().await?)
    }
}
