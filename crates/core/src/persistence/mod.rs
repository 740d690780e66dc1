//! Persistence contract consumed from the host.
//!
//! The host owns the database. This crate only needs object bytes for the
//! database backend and download-secret records for proxy presign.

mod memory;

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryPersistence;

/// Persistence failures.
#[derive(Debug, Clone, Error)]
pub enum PersistenceError {
    /// Record not found.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Underlying store failure.
    #[error("persistence backend error: {0}")]
    Backend(String),
}

impl PersistenceError {
    /// Create a backend error.
    #[must_use]
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Object bytes held by the database backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// MIME type.
    pub content_type: String,
    /// Content.
    pub data: Bytes,
    /// When the object was written.
    pub stored_at: DateTime<Utc>,
}

/// A minted download token and the secret needed to verify it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadSecretRecord {
    /// Token identifier.
    pub token_id: Uuid,
    /// File the token grants access to.
    pub file_id: String,
    /// Subject the token is bound to, if any.
    pub subject_id: Option<String>,
    /// Organization the token is bound to, if any.
    pub organization_id: Option<String>,
    /// Nonce followed by signing key.
    pub secret: Vec<u8>,
    /// Token string handed out in the URL.
    pub token: String,
    /// Encoded payload the token signs.
    pub payload: Vec<u8>,
    /// Expiry.
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for DownloadSecretRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadSecretRecord")
            .field("token_id", &self.token_id)
            .field("file_id", &self.file_id)
            .field("subject_id", &self.subject_id)
            .field("organization_id", &self.organization_id)
            .field("secret", &"[hidden]")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Storage the host provides to this crate.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    /// Write object bytes.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        object: StoredObject,
    ) -> Result<(), PersistenceError>;

    /// Read object bytes.
    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<StoredObject>, PersistenceError>;

    /// Remove object bytes. Removing a missing object is not an error.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), PersistenceError>;

    /// Whether object bytes exist.
    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, PersistenceError>;

    /// Store a download secret.
    async fn store_download_secret(
        &self,
        record: DownloadSecretRecord,
    ) -> Result<(), PersistenceError>;

    /// Look up a download secret by file and token.
    async fn find_download_secret(
        &self,
        file_id: &str,
        token: &str,
    ) -> Result<Option<DownloadSecretRecord>, PersistenceError>;

    /// Check the store is reachable.
    async fn ping(&self) -> Result<(), PersistenceError>;
}

/// A persistence client that may be installed after startup.
///
/// Set at most once; readers see `None` until then.
#[derive(Default)]
pub struct PersistenceSlot {
    inner: OnceLock<Arc<dyn PersistenceClient>>,
}

impl PersistenceSlot {
    /// Empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot holding a client.
    #[must_use]
    pub fn with_client(client: Arc<dyn PersistenceClient>) -> Self {
        let slot = Self::new();
        let _ = slot.inner.set(client);
        slot
    }

    /// Install the client. Returns `false` if one was already installed.
    pub fn set(&self, client: Arc<dyn PersistenceClient>) -> bool {
        self.inner.set(client).is_ok()
    }

    /// The installed client, if any.
    #[must_use]
    pub fn get(&self) -> Option<Arc<dyn PersistenceClient>> {
        self.inner.get().cloned()
    }
}

impl std::fmt::Debug for PersistenceSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceSlot")
            .field("installed", &self.inner.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_set_once() {
        let slot = PersistenceSlot::new();
        assert!(slot.get().is_none());
        assert!(slot.set(Arc::new(MemoryPersistence::new())));
        assert!(!slot.set(Arc::new(MemoryPersistence::new())));
        assert!(slot.get().is_some());
    }

    #[test]
    fn test_record_debug_hides_secret() {
        let record = DownloadSecretRecord {
            token_id: Uuid::nil(),
            file_id: "F1".to_string(),
            subject_id: None,
            organization_id: None,
            secret: vec![42; 128],
            token: "tok".to_string(),
            payload: Vec::new(),
            expires_at: Utc::now(),
        };
        let debug = format!("{record:?}");
        assert!(debug.contains("[hidden]"));
        assert!(!debug.contains("42, 42"));
    }
}
