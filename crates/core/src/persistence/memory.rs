//! In-memory persistence using Moka and DashMap.
//!
//! Download secrets expire on their own `expires_at`; object bytes live until
//! deleted. Intended for development, tests and the probe binary.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use moka::Expiry;
use moka::sync::Cache;

use super::{DownloadSecretRecord, PersistenceClient, PersistenceError, StoredObject};

/// Default maximum number of live download secrets.
const DEFAULT_SECRET_CAPACITY: u64 = 10_000;

type SecretKey = (String, String);

/// Expires each secret at its own deadline.
struct SecretExpiry;

impl Expiry<SecretKey, Arc<DownloadSecretRecord>> for SecretExpiry {
    fn expire_after_create(
        &self,
        _key: &SecretKey,
        value: &Arc<DownloadSecretRecord>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(
            (value.expires_at - Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO),
        )
    }
}

/// Process-local persistence client.
#[derive(Clone)]
pub struct MemoryPersistence {
    secrets: Cache<SecretKey, Arc<DownloadSecretRecord>>,
    objects: Arc<DashMap<SecretKey, StoredObject>>,
}

impl MemoryPersistence {
    /// Creates an empty store with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SECRET_CAPACITY)
    }

    /// Creates an empty store holding at most `max_secrets` download secrets.
    #[must_use]
    pub fn with_capacity(max_secrets: u64) -> Self {
        let secrets = Cache::builder()
            .max_capacity(max_secrets)
            .expire_after(SecretExpiry)
            .build();
        Self {
            secrets,
            objects: Arc::new(DashMap::new()),
        }
    }

    /// Number of stored objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    fn key(bucket: &str, key: &str) -> SecretKey {
        (bucket.to_string(), key.to_string())
    }
}

impl Default for MemoryPersistence {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryPersistence")
            .field("secrets", &self.secrets.entry_count())
            .field("objects", &self.objects.len())
            .finish()
    }
}

#[async_trait]
impl PersistenceClient for MemoryPersistence {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        object: StoredObject,
    ) -> Result<(), PersistenceError> {
        self.objects.insert(Self::key(bucket, key), object);
        Ok(())
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<StoredObject>, PersistenceError> {
        Ok(self
            .objects
            .get(&Self::key(bucket, key))
            .map(|entry| entry.value().clone()))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), PersistenceError> {
        self.objects.remove(&Self::key(bucket, key));
        Ok(())
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, PersistenceError> {
        Ok(self.objects.contains_key(&Self::key(bucket, key)))
    }

    async fn store_download_secret(
        &self,
        record: DownloadSecretRecord,
    ) -> Result<(), PersistenceError> {
        let key = (record.file_id.clone(), record.token.clone());
        self.secrets.insert(key, Arc::new(record));
        Ok(())
    }

    async fn find_download_secret(
        &self,
        file_id: &str,
        token: &str,
    ) -> Result<Option<DownloadSecretRecord>, PersistenceError> {
        Ok(self
            .secrets
            .get(&Self::key(file_id, token))
            .filter(|record| record.expires_at > Utc::now())
            .map(|record| (*record).clone()))
    }

    async fn ping(&self) -> Result<(), PersistenceError> {
        Ok(())
    }
}
