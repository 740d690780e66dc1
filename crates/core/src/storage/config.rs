//! Provider credentials and per-request provider options.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::presign::TokenIssuer;

/// Credentials for a storage backend.
///
/// All backends share this struct; fields a backend does not use stay empty.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderCredentials {
    /// Bucket name.
    pub bucket: String,
    /// Region.
    pub region: String,
    /// Account identifier (R2).
    pub account_id: String,
    /// Access key ID.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Custom endpoint.
    pub endpoint: String,
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("account_id", &self.account_id)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[hidden]")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Parameters for application-signed download URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyPresignConfig {
    /// Base URL download links are composed under.
    pub base_url: String,
    /// Token-issuing authority. Absent when none is configured.
    pub token_issuer: Option<Arc<TokenIssuer>>,
}

impl ProxyPresignConfig {
    /// Token issuer name, if an authority is configured.
    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        self.token_issuer.as_deref().map(TokenIssuer::issuer)
    }

    /// Token audience, if an authority is configured.
    #[must_use]
    pub fn audience(&self) -> Option<&str> {
        self.token_issuer.as_deref().map(TokenIssuer::audience)
    }
}

/// Per-request provider configuration.
///
/// `Clone` is a deep copy: the extension map and every string are duplicated,
/// so a caller may edit its copy without touching a cached original.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderOptions {
    /// Bucket name.
    pub bucket: String,
    /// Base path (disk root, or key prefix for object stores).
    pub base_path: String,
    /// Region.
    pub region: String,
    /// Custom endpoint.
    pub endpoint: String,
    /// Public URL files on disk are served under.
    pub local_url: String,
    /// Serve downloads through application-signed URLs.
    pub proxy_presign_enabled: bool,
    /// Proxy presign parameters.
    pub proxy_presign: Option<ProxyPresignConfig>,
    extras: BTreeMap<String, Value>,
}

impl ProviderOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bucket.
    #[must_use]
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    /// Set the base path.
    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Set the region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Set the endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the local URL.
    #[must_use]
    pub fn with_local_url(mut self, local_url: impl Into<String>) -> Self {
        self.local_url = local_url.into();
        self
    }

    /// Enable or disable proxy presign.
    #[must_use]
    pub fn with_proxy_presign_enabled(mut self, enabled: bool) -> Self {
        self.proxy_presign_enabled = enabled;
        self
    }

    /// Set the proxy presign parameters.
    #[must_use]
    pub fn with_proxy_presign(mut self, config: ProxyPresignConfig) -> Self {
        self.proxy_presign = Some(config);
        self
    }

    /// Set an extension flag.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_extra(key, value);
        self
    }

    /// Set an extension flag in place.
    pub fn set_extra(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.extras.insert(key.into(), value.into());
    }

    /// Read an extension flag.
    #[must_use]
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extras.get(key)
    }

    /// All extension flags, ordered by key.
    #[must_use]
    pub fn extras(&self) -> &BTreeMap<String, Value> {
        &self.extras
    }
}
