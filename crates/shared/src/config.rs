//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Storage routing configuration.
    #[serde(default)]
    pub storage: StorageSettings,
    /// Proxy presign (application-signed download URL) configuration.
    #[serde(default)]
    pub proxy_presign: ProxyPresignSettings,
}

/// Storage routing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Route every request to the local disk backend.
    #[serde(default)]
    pub dev_mode: bool,
    /// Lifetime of a cached provider client in seconds.
    #[serde(default = "default_client_pool_ttl")]
    pub client_pool_ttl_secs: u64,
    /// Maximum accepted upload size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Allowed MIME types for upload. Empty allows everything.
    #[serde(default)]
    pub allowed_mime_types: Vec<String>,
    /// Per-backend configuration blocks.
    #[serde(default)]
    pub providers: ProvidersSettings,
    /// Module classifier to backend routes, evaluated in order.
    #[serde(default = "default_module_routes")]
    pub module_routes: Vec<RouteSettings>,
    /// Template-kind classifier to backend routes, evaluated in order.
    #[serde(default = "default_template_routes")]
    pub template_routes: Vec<RouteSettings>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            dev_mode: false,
            client_pool_ttl_secs: default_client_pool_ttl(),
            max_file_size: default_max_file_size(),
            allowed_mime_types: Vec::new(),
            providers: ProvidersSettings::default(),
            module_routes: default_module_routes(),
            template_routes: default_template_routes(),
        }
    }
}

fn default_client_pool_ttl() -> u64 {
    900 // 15 minutes
}

fn default_max_file_size() -> u64 {
    32 * 1024 * 1024 // 32MB
}

fn default_module_routes() -> Vec<RouteSettings> {
    vec![
        RouteSettings::new("trust_center_module", "r2"),
        RouteSettings::new("compliance_module", "s3"),
    ]
}

fn default_template_routes() -> Vec<RouteSettings> {
    vec![RouteSettings::new("trust_center_nda", "r2")]
}

/// Configuration blocks for every supported backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersSettings {
    /// AWS S3 (or S3-compatible) object store.
    #[serde(default)]
    pub s3: ProviderSettings,
    /// Cloudflare R2 object store.
    #[serde(default, alias = "cloudflare_r2", alias = "cloudflarer2")]
    pub r2: ProviderSettings,
    /// Local disk.
    #[serde(default)]
    pub disk: ProviderSettings,
    /// Database-backed blob storage.
    #[serde(default)]
    pub database: ProviderSettings,
}

/// Credentials and configuration for a single backend.
///
/// Most backends share the same shape; fields a backend does not use stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProviderSettings {
    /// Whether the backend may be selected.
    #[serde(default)]
    pub enabled: bool,
    /// Bucket name (base path for disk).
    #[serde(default)]
    pub bucket: String,
    /// Region.
    #[serde(default)]
    pub region: String,
    /// Custom endpoint (local URL for disk).
    #[serde(default)]
    pub endpoint: String,
    /// Access key ID.
    #[serde(default)]
    pub access_key_id: String,
    /// Secret access key.
    #[serde(default)]
    pub secret_access_key: String,
    /// Account identifier (R2).
    #[serde(default)]
    pub account_id: String,
    /// Fail startup when the backend is unreachable.
    #[serde(default)]
    pub ensure_available: bool,
    /// Serve downloads through application-signed URLs.
    #[serde(default)]
    pub proxy_presign_enabled: bool,
}

/// A classifier value routed to a backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RouteSettings {
    /// Classifier value to match (module or template kind).
    pub hint: String,
    /// Backend name: `s3`, `r2`, `disk` or `database`.
    pub provider: String,
}

impl RouteSettings {
    /// Creates a new route.
    #[must_use]
    pub fn new(hint: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            hint: hint.into(),
            provider: provider.into(),
        }
    }
}

/// Proxy presign configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyPresignSettings {
    /// Whether a token-issuing authority is configured.
    #[serde(default)]
    pub enabled: bool,
    /// Base URL download links are composed under.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Token issuer.
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// Token audience.
    #[serde(default = "default_audience")]
    pub audience: String,
    /// Default token lifetime in seconds.
    #[serde(default = "default_presign_duration")]
    pub default_duration_secs: u64,
    /// Upper bound for one persistence round-trip in seconds.
    #[serde(default = "default_persistence_timeout")]
    pub persistence_timeout_secs: u64,
}

impl Default for ProxyPresignSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_base_url(),
            issuer: default_issuer(),
            audience: default_audience(),
            default_duration_secs: default_presign_duration(),
            persistence_timeout_secs: default_persistence_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:17608/v1/files".to_string()
}

fn default_issuer() -> String {
    "http://localhost:17608".to_string()
}

fn default_audience() -> String {
    "http://localhost:17608".to_string()
}

fn default_presign_duration() -> u64 {
    900 // 15 minutes
}

fn default_persistence_timeout() -> u64 {
    5
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("STOWAGE").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Parses configuration from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed.
    pub fn from_toml(document: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(document, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
