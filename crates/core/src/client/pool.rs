//! TTL cache of live provider handles.
//!
//! Entries are evicted lazily: a stale entry is treated as absent on the next
//! lookup. Builds for the same key are serialised; different keys never
//! wait on each other.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sha2::{Digest, Sha256};

use crate::storage::{BackendKind, ProviderCredentials, ProviderHandle, ProviderOptions};

/// Default lifetime of a cached handle (15 minutes).
pub const DEFAULT_POOL_TTL: Duration = Duration::from_secs(15 * 60);

/// Wall clock, injectable for tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Identity of a cached handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Tenant the handle was built for.
    pub tenant_id: String,
    /// Backend kind.
    pub kind: BackendKind,
    /// SHA-256 over credentials and options.
    pub fingerprint: String,
}

impl CacheKey {
    /// Key for a tenant, backend and configuration.
    #[must_use]
    pub fn new(
        tenant_id: impl Into<String>,
        kind: BackendKind,
        credentials: &ProviderCredentials,
        options: &ProviderOptions,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            kind,
            fingerprint: fingerprint(credentials, options),
        }
    }
}

/// Hex SHA-256 over every field that changes how a handle is built.
#[must_use]
pub fn fingerprint(credentials: &ProviderCredentials, options: &ProviderOptions) -> String {
    let mut hasher = Sha256::new();
    let mut field = |value: &str| {
        hasher.update((value.len() as u64).to_be_bytes());
        hasher.update(value.as_bytes());
    };

    field(&credentials.bucket);
    field(&credentials.region);
    field(&credentials.account_id);
    field(&credentials.access_key_id);
    field(&credentials.secret_access_key);
    field(&credentials.endpoint);

    field(&options.bucket);
    field(&options.base_path);
    field(&options.region);
    field(&options.endpoint);
    field(&options.local_url);
    field(if options.proxy_presign_enabled { "1" } else { "0" });
    if let Some(proxy) = &options.proxy_presign {
        field(&proxy.base_url);
        field(proxy.issuer().unwrap_or_default());
        field(proxy.audience().unwrap_or_default());
    }
    for (key, value) in options.extras() {
        field(key);
        field(&value.to_string());
    }

    hex::encode(hasher.finalize())
}

struct CacheEntry {
    handle: Arc<dyn ProviderHandle>,
    created_at: DateTime<Utc>,
}

type Slot = Arc<RwLock<Option<CacheEntry>>>;

/// Cache of provider handles keyed by [`CacheKey`].
pub struct ClientPool {
    entries: DashMap<CacheKey, Slot>,
    ttl: Duration,
    clock: Clock,
}

impl ClientPool {
    /// Pool with the given TTL and the system clock.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(Utc::now))
    }

    /// Pool with a custom clock.
    #[must_use]
    pub fn with_clock(ttl: Duration, clock: Clock) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
        }
    }

    /// Configured TTL.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current time according to the pool clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        (now - entry.created_at)
            .to_std()
            .map_or(true, |age| age <= self.ttl)
    }

    fn slot(&self, key: &CacheKey) -> Option<Slot> {
        self.entries.get(key).map(|slot| Arc::clone(slot.value()))
    }

    fn slot_or_insert(&self, key: &CacheKey) -> Slot {
        Arc::clone(self.entries.entry(key.clone()).or_default().value())
    }

    /// Cached handle, if present and not stale.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<dyn ProviderHandle>> {
        let slot = self.slot(key)?;
        let now = self.now();
        {
            let guard = slot.read().unwrap_or_else(PoisonError::into_inner);
            match guard.as_ref() {
                Some(entry) if self.is_fresh(entry, now) => return Some(Arc::clone(&entry.handle)),
                None => return None,
                Some(_) => {}
            }
        }

        let mut guard = slot.write().unwrap_or_else(PoisonError::into_inner);
        if guard.as_ref().is_some_and(|entry| !self.is_fresh(entry, now)) {
            tracing::debug!(tenant = %key.tenant_id, provider = %key.kind, "evicting stale storage client");
            *guard = None;
        }
        None
    }

    /// Store a handle created at `created_at`.
    pub fn set(&self, key: &CacheKey, handle: Arc<dyn ProviderHandle>, created_at: DateTime<Utc>) {
        let slot = self.slot_or_insert(key);
        let mut guard = slot.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(CacheEntry { handle, created_at });
    }

    /// Cached handle, or one produced by `build` and cached.
    ///
    /// Concurrent callers for the same key wait for a single build.
    pub fn get_or_try_insert_with<F, E>(
        &self,
        key: &CacheKey,
        build: F,
    ) -> Result<Arc<dyn ProviderHandle>, E>
    where
        F: FnOnce() -> Result<Arc<dyn ProviderHandle>, E>,
    {
        if let Some(handle) = self.get(key) {
            return Ok(handle);
        }

        let slot = self.slot_or_insert(key);
        let mut guard = slot.write().unwrap_or_else(PoisonError::into_inner);
        let now = self.now();
        if let Some(entry) = guard.as_ref().filter(|entry| self.is_fresh(entry, now)) {
            return Ok(Arc::clone(&entry.handle));
        }

        let handle = build()?;
        *guard = Some(CacheEntry {
            handle: Arc::clone(&handle),
            created_at: self.now(),
        });
        Ok(handle)
    }

    /// Drop a cached handle. Returns whether one was cached.
    ///
    /// The key's slot stays in the map so a build already holding it still
    /// publishes its handle.
    pub fn remove(&self, key: &CacheKey) -> bool {
        let Some(slot) = self.slot(key) else {
            return false;
        };
        let mut guard = slot.write().unwrap_or_else(PoisonError::into_inner);
        guard.take().is_some()
    }

    /// Number of keys holding a handle (fresh or not yet evicted).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|slot| {
                slot.value()
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .is_some()
            })
            .count()
    }

    /// Whether the pool holds no handles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ClientPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_TTL)
    }
}

impl std::fmt::Debug for ClientPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientPool")
            .field("keys", &self.entries.len())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
