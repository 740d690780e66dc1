//! Client service: cached handle lookup with build-on-miss.

use std::sync::Arc;

use thiserror::Error;

use super::pool::{CacheKey, ClientPool};
use crate::context::ResolutionContext;
use crate::resolver::ResolvedProvider;
use crate::storage::{
    BackendKind, BuildError, BuilderRegistry, ProviderCredentials, ProviderHandle, ProviderOptions,
};

/// Tenant used in cache keys when the context carries none.
pub const SHARED_TENANT: &str = "_shared";

/// Why a client could not be produced.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No builder is registered for the backend.
    #[error("no builder registered for {0} storage")]
    NoBuilder(BackendKind),

    /// The builder rejected the configuration.
    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Hands out live provider handles, building and caching them on demand.
#[derive(Debug, Clone)]
pub struct ClientService {
    pool: Arc<ClientPool>,
    registry: Arc<BuilderRegistry>,
}

impl ClientService {
    /// Creates a service over a pool and a builder registry.
    #[must_use]
    pub fn new(pool: Arc<ClientPool>, registry: Arc<BuilderRegistry>) -> Self {
        Self { pool, registry }
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &ClientPool {
        &self.pool
    }

    /// Cache key for a resolved provider in this context.
    #[must_use]
    pub fn cache_key(ctx: &ResolutionContext, resolved: &ResolvedProvider) -> CacheKey {
        CacheKey::new(
            ctx.tenant().unwrap_or(SHARED_TENANT),
            resolved.kind,
            &resolved.credentials,
            &resolved.options,
        )
    }

    /// Cached handle, or a freshly built one.
    ///
    /// The builder receives its own copy of `options`.
    pub fn try_get_client(
        &self,
        ctx: &ResolutionContext,
        key: &CacheKey,
        kind: BackendKind,
        credentials: &ProviderCredentials,
        options: &ProviderOptions,
    ) -> Result<Arc<dyn ProviderHandle>, ClientError> {
        let builder = self.registry.get(kind).ok_or(ClientError::NoBuilder(kind))?;
        self.pool.get_or_try_insert_with(key, || {
            tracing::info!(tenant = %key.tenant_id, provider = %kind, "building storage client");
            builder
                .build(ctx, credentials, options.clone())
                .map_err(ClientError::from)
        })
    }

    /// Like [`Self::try_get_client`], but logs the failure and returns `None`.
    pub fn get_client(
        &self,
        ctx: &ResolutionContext,
        key: &CacheKey,
        kind: BackendKind,
        credentials: &ProviderCredentials,
        options: &ProviderOptions,
    ) -> Option<Arc<dyn ProviderHandle>> {
        match self.try_get_client(ctx, key, kind, credentials, options) {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::error!(provider = %kind, error = %err, "failed to get storage client");
                None
            }
        }
    }
}
