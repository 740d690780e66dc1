//! Storage orchestration.
//!
//! [`StorageService`] is the composition root: it enriches the request
//! context, resolves a backend, obtains a cached client for it, and runs the
//! operation. Downloads that need indirection go through proxy presign,
//! falling back to native presign when the proxy path is not wired.

mod availability;
mod error;
mod upload;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future::join_all;
use stowage_shared::{AppConfig, ProvidersSettings};
use uuid::Uuid;

pub use availability::{AvailabilityReport, ProviderStatus};
pub use error::{ResolutionFailure, ServiceError};
pub use upload::{UploadPolicy, storage_key};

use crate::client::{ClientPool, ClientService};
use crate::context::ResolutionContext;
use crate::persistence::{PersistenceClient, PersistenceSlot};
use crate::presign::{DEFAULT_PRESIGN_DURATION, PresignError, ProxyPresigner, TokenIssuer};
use crate::resolver::{
    ResolveError, ResolvedProvider, Resolver, resolve_provider_from_config, settings_for,
};
use crate::storage::{
    BackendKind, BuilderRegistry, DownloadedObject, ProviderHandle, ProxyPresignConfig,
    StoredFile, UploadObject, UploadOptions,
};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
const DEFAULT_MAX_FILE_SIZE: u64 = 32 * 1024 * 1024;

/// Routes file operations to the backend each request resolves to.
#[derive(Debug)]
pub struct StorageService {
    resolver: Resolver,
    clients: ClientService,
    presigner: ProxyPresigner,
    persistence: Arc<PersistenceSlot>,
    proxy: Option<ProxyPresignConfig>,
    policy: UploadPolicy,
    providers: ProvidersSettings,
    dev_mode: bool,
    presign_duration: Duration,
}

impl StorageService {
    /// Assemble a service from its parts.
    ///
    /// `presigner` should share `persistence` so that a client installed later
    /// through [`Self::set_persistence`] reaches it.
    #[must_use]
    pub fn new(
        resolver: Resolver,
        clients: ClientService,
        presigner: ProxyPresigner,
        persistence: Arc<PersistenceSlot>,
    ) -> Self {
        Self {
            resolver,
            clients,
            presigner,
            persistence,
            proxy: None,
            policy: UploadPolicy::new(DEFAULT_MAX_FILE_SIZE),
            providers: ProvidersSettings::default(),
            dev_mode: false,
            presign_duration: DEFAULT_PRESIGN_DURATION,
        }
    }

    /// Wire everything from configuration.
    ///
    /// `persistence` may be `None` during early startup and installed later.
    pub fn from_config(
        config: &AppConfig,
        persistence: Option<Arc<dyn PersistenceClient>>,
    ) -> Result<Self, ServiceError> {
        let storage = &config.storage;
        let presign = &config.proxy_presign;

        let proxy = presign.enabled.then(|| ProxyPresignConfig {
            base_url: presign.base_url.clone(),
            token_issuer: Some(Arc::new(TokenIssuer::new(
                presign.issuer.clone(),
                presign.audience.clone(),
            ))),
        });
        let resolver = Resolver::from_settings(storage, proxy.clone())?;
        let clients = ClientService::new(
            Arc::new(ClientPool::new(Duration::from_secs(storage.client_pool_ttl_secs))),
            Arc::new(BuilderRegistry::with_defaults()),
        );

        let slot = Arc::new(persistence.map_or_else(PersistenceSlot::new, PersistenceSlot::with_client));
        let duration = Duration::from_secs(presign.default_duration_secs);
        let presigner = ProxyPresigner::new(Arc::clone(&slot))
            .with_timeout(Duration::from_secs(presign.persistence_timeout_secs))
            .with_default_duration(duration);
        let policy = UploadPolicy::new(storage.max_file_size)
            .with_allowed_mime_types(storage.allowed_mime_types.iter().cloned());

        let mut service = Self::new(resolver, clients, presigner, slot)
            .with_policy(policy)
            .with_providers(storage.providers.clone())
            .with_dev_mode(storage.dev_mode)
            .with_presign_duration(duration);
        if let Some(proxy) = proxy {
            service = service.with_proxy_presign(proxy);
        }

        tracing::info!(
            dev_mode = storage.dev_mode,
            proxy_presign = presign.enabled,
            rules = service.resolver.len(),
            "storage service configured"
        );
        Ok(service)
    }

    /// Set upload limits.
    #[must_use]
    pub fn with_policy(mut self, policy: UploadPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the proxy presign configuration used to redeem tokens.
    #[must_use]
    pub fn with_proxy_presign(mut self, proxy: ProxyPresignConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Set the backend blocks probed for availability.
    #[must_use]
    pub fn with_providers(mut self, providers: ProvidersSettings) -> Self {
        self.providers = providers;
        self
    }

    /// Probe only the dev-mode disk backend.
    #[must_use]
    pub fn with_dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    /// Lifetime for native presigned URLs requested with zero duration.
    #[must_use]
    pub fn with_presign_duration(mut self, duration: Duration) -> Self {
        self.presign_duration = duration;
        self
    }

    /// The resolver.
    #[must_use]
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// The client service.
    #[must_use]
    pub fn clients(&self) -> &ClientService {
        &self.clients
    }

    /// Upload limits.
    #[must_use]
    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Install the persistence client. Returns `false` if one is already set.
    ///
    /// Cached database handles share the slot and pick the client up on
    /// their next call.
    pub fn set_persistence(&self, client: Arc<dyn PersistenceClient>) -> bool {
        let installed = self.persistence.set(client);
        if installed {
            tracing::info!("storage persistence client installed");
        }
        installed
    }

    fn enrich(&self, ctx: ResolutionContext) -> ResolutionContext {
        let ctx = match ctx.persistence_slot() {
            Some(_) => ctx,
            None => ctx.with_persistence_slot(Arc::clone(&self.persistence)),
        };
        match self.persistence.get() {
            Some(client) if ctx.persistence().is_none() => ctx.with_persistence(client),
            _ => ctx,
        }
    }

    fn client_for(
        &self,
        ctx: &ResolutionContext,
    ) -> Result<(Arc<dyn ProviderHandle>, ResolvedProvider), ServiceError> {
        let resolved = self.resolver.resolve(ctx)?;
        let key = ClientService::cache_key(ctx, &resolved);
        let handle = self.clients.try_get_client(
            ctx,
            &key,
            resolved.kind,
            &resolved.credentials,
            &resolved.options,
        )?;
        Ok((handle, resolved))
    }

    /// Validate and store a file on the backend the context resolves to.
    ///
    /// The returned file records its provider and hints so later operations
    /// route back to the same backend.
    pub async fn upload(
        &self,
        ctx: ResolutionContext,
        mut options: UploadOptions,
        data: Bytes,
    ) -> Result<StoredFile, ServiceError> {
        if options.content_type.trim().is_empty() {
            options.content_type = DEFAULT_CONTENT_TYPE.to_string();
        }
        self.policy.validate(&options.content_type, data.len() as u64)?;

        let ctx = self.enrich(ctx).with_upload(options.clone());
        let (handle, resolved) = self.client_for(&ctx)?;
        let (folder, key) = storage_key(&options);

        let metadata = handle
            .upload(UploadObject {
                key,
                content_type: options.content_type.clone(),
                data,
            })
            .await?;

        let mut hints = options.hints;
        if hints.organization_id.is_none() {
            hints.organization_id = ctx.tenant().map(str::to_string);
        }
        tracing::info!(
            provider = %resolved.kind,
            key = %metadata.key,
            size = metadata.size,
            "file uploaded"
        );

        Ok(StoredFile {
            id: Uuid::new_v4().to_string(),
            provider: Some(metadata.provider),
            bucket: metadata.bucket,
            key: metadata.key,
            folder,
            full_uri: metadata.full_uri,
            size: metadata.size,
            content_type: metadata.content_type,
            original_name: options.file_name,
            hints,
        })
    }

    /// Fetch a stored file.
    pub async fn download(
        &self,
        ctx: ResolutionContext,
        file: &StoredFile,
    ) -> Result<DownloadedObject, ServiceError> {
        let ctx = self.enrich(ctx).for_file(file);
        let (handle, _) = self.client_for(&ctx)?;
        Ok(handle.download(file).await?)
    }

    /// Remove a stored file.
    pub async fn delete(&self, ctx: ResolutionContext, file: &StoredFile) -> Result<(), ServiceError> {
        let ctx = self.enrich(ctx).for_file(file);
        let (handle, resolved) = self.client_for(&ctx)?;
        handle.delete(file).await?;
        tracing::info!(provider = %resolved.kind, key = %file.key, "file deleted");
        Ok(())
    }

    /// Whether a stored file exists.
    pub async fn exists(&self, ctx: ResolutionContext, file: &StoredFile) -> Result<bool, ServiceError> {
        let ctx = self.enrich(ctx).for_file(file);
        let (handle, _) = self.client_for(&ctx)?;
        Ok(handle.exists(file).await?)
    }

    /// Download URL for a stored file.
    ///
    /// Proxy presign is used when the backend is configured for it or cannot
    /// presign natively. If the proxy path is not wired and the backend can
    /// presign, the native URL is returned instead. Zero `expires_in` uses
    /// the configured default.
    pub async fn presigned_url(
        &self,
        ctx: ResolutionContext,
        file: &StoredFile,
        expires_in: Duration,
    ) -> Result<String, ServiceError> {
        let ctx = self.enrich(ctx).for_file(file);
        let (handle, resolved) = self.client_for(&ctx)?;
        let native = handle.supports_presign();

        if resolved.options.proxy_presign_enabled || !native {
            let proxied = self
                .presigner
                .generate_download_url(
                    file,
                    ctx.caller(),
                    resolved.options.proxy_presign.as_ref(),
                    expires_in,
                )
                .await;
            match proxied {
                Ok(url) => return Ok(url),
                Err(err) if err.is_recoverable() && native => {
                    tracing::warn!(
                        provider = %resolved.kind,
                        file_id = %file.id,
                        error = %err,
                        "proxy presign unavailable, falling back to native presign"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        let expires_in = if expires_in.is_zero() {
            self.presign_duration
        } else {
            expires_in
        };
        Ok(handle.presigned_url(file, expires_in).await?)
    }

    /// Redeem a proxy download token and fetch the file.
    pub async fn download_with_token(
        &self,
        ctx: ResolutionContext,
        file: &StoredFile,
        token: &str,
    ) -> Result<DownloadedObject, ServiceError> {
        let issuer = self
            .proxy
            .as_ref()
            .and_then(|p| p.token_issuer.clone())
            .ok_or(ServiceError::TokensDisabled)?;
        let payload = self
            .presigner
            .verify(&file.id, token, ctx.caller(), &issuer)
            .await?;
        if file.object_uri().as_deref() != Some(payload.object_uri.as_str()) {
            return Err(PresignError::TokenMismatch.into());
        }
        self.download(ctx, file).await
    }

    /// Probe every enabled backend concurrently.
    pub async fn check_availability(&self) -> AvailabilityReport {
        let ctx = self.enrich(ResolutionContext::new());
        if self.dev_mode {
            let status = self
                .probe(&ctx, BackendKind::Disk, false, self.resolver.resolve(&ctx))
                .await;
            return AvailabilityReport::new(vec![status]);
        }

        let ctx = &ctx;
        let checks = BackendKind::PREFERENCE_ORDER
            .into_iter()
            .filter(|kind| settings_for(*kind, &self.providers).enabled)
            .map(|kind| {
                let required = settings_for(kind, &self.providers).ensure_available;
                let resolved =
                    resolve_provider_from_config(kind, &self.providers, self.proxy.as_ref());
                self.probe(ctx, kind, required, resolved)
            });
        AvailabilityReport::new(join_all(checks).await)
    }

    /// Probe backends and fail if a required one is unreachable.
    pub async fn ensure_available(&self) -> Result<AvailabilityReport, ServiceError> {
        let report = self.check_availability().await;
        if let Some(status) = report.required_failure() {
            return Err(ServiceError::Unavailable {
                kind: status.kind,
                message: status.error.clone().unwrap_or_default(),
            });
        }
        Ok(report)
    }

    async fn probe(
        &self,
        ctx: &ResolutionContext,
        kind: BackendKind,
        required: bool,
        resolved: Result<ResolvedProvider, ResolveError>,
    ) -> ProviderStatus {
        let outcome = async {
            let resolved = resolved?;
            let key = ClientService::cache_key(ctx, &resolved);
            let handle = self.clients.try_get_client(
                ctx,
                &key,
                resolved.kind,
                &resolved.credentials,
                &resolved.options,
            )?;
            handle.probe().await?;
            Ok::<_, ServiceError>(())
        }
        .await;

        match outcome {
            Ok(()) => {
                tracing::info!(provider = %kind, "storage provider available");
                ProviderStatus::up(kind, required)
            }
            Err(err) => {
                let message = describe(&err);
                tracing::warn!(provider = %kind, required, error = %message, "storage provider unavailable");
                ProviderStatus::down(kind, required, message)
            }
        }
    }
}

/// Error message with its source chain.
fn describe(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryPersistence;
    use crate::storage::{
        BuildError, MockProviderHandle, ProviderBuilder, ProviderCredentials, ProviderOptions,
        StorageError,
    };
    use std::path::Path;
    use stowage_shared::{AuthenticatedCaller, ProviderSettings, StorageSettings};

    const BASE: &str = "https://api.example.com/v1/files";
    const LOCAL: &str = "http://localhost:17608/files";

    fn disk_config(dir: &Path, proxy_presign: bool, local_url: &str) -> AppConfig {
        let mut config = AppConfig::default();
        config.storage.providers.disk = ProviderSettings {
            enabled: true,
            bucket: dir.to_string_lossy().into_owned(),
            endpoint: local_url.to_string(),
            proxy_presign_enabled: proxy_presign,
            ..Default::default()
        };
        config.proxy_presign.enabled = true;
        config.proxy_presign.base_url = BASE.to_string();
        config
    }

    fn memory() -> Option<Arc<dyn PersistenceClient>> {
        Some(Arc::new(MemoryPersistence::new()))
    }

    fn text(name: &str, folder: &str) -> UploadOptions {
        UploadOptions {
            file_name: name.to_string(),
            content_type: "text/plain".to_string(),
            folder: Some(folder.to_string()),
            ..Default::default()
        }
    }

    fn token_of(url: &str) -> &str {
        url.split_once("?token=").map(|(_, t)| t).unwrap()
    }

    #[tokio::test]
    async fn test_disk_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let service = StorageService::from_config(&disk_config(dir.path(), false, ""), None).unwrap();

        let file = service
            .upload(
                ResolutionContext::new().with_tenant("org-1"),
                text("notes v1.txt", "docs"),
                Bytes::from_static(b"hello"),
            )
            .await
            .unwrap();

        assert_eq!(file.provider, Some(BackendKind::Disk));
        assert_eq!(file.key, "docs/notes_v1.txt");
        assert_eq!(file.folder, "docs");
        assert_eq!(file.original_name, "notes v1.txt");
        assert_eq!(file.size, 5);
        assert!(file.full_uri.starts_with("file://"));
        assert_eq!(file.hints.organization_id.as_deref(), Some("org-1"));
        assert!(dir.path().join("docs/notes_v1.txt").exists());

        let ctx = ResolutionContext::new();
        assert!(service.exists(ctx.clone(), &file).await.unwrap());
        let downloaded = service.download(ctx.clone(), &file).await.unwrap();
        assert_eq!(downloaded.data, Bytes::from_static(b"hello"));

        service.delete(ctx.clone(), &file).await.unwrap();
        assert!(!service.exists(ctx, &file).await.unwrap());
    }

    #[tokio::test]
    async fn test_upload_rejected_before_routing() {
        let mut config = AppConfig::default();
        config.storage.max_file_size = 4;
        let service = StorageService::from_config(&config, None).unwrap();

        let err = service
            .upload(ResolutionContext::new(), text("a.txt", "x"), Bytes::from_static(b"12345"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Storage(StorageError::FileTooLarge { .. })));
    }

    #[tokio::test]
    async fn test_no_enabled_backend() {
        let service = StorageService::from_config(&AppConfig::default(), None).unwrap();
        let err = service
            .upload(ResolutionContext::new(), text("a.txt", "x"), Bytes::from_static(b"1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::ProviderResolutionFailed(ResolutionFailure::Resolve(ResolveError::NoMatch))
        ));
    }

    #[tokio::test]
    async fn test_proxy_presign_and_redeem() {
        let dir = tempfile::tempdir().unwrap();
        let service =
            StorageService::from_config(&disk_config(dir.path(), true, LOCAL), memory()).unwrap();
        let caller = AuthenticatedCaller::new("user-1", "org-1");
        let ctx = ResolutionContext::new().with_caller(caller.clone());

        let file = service
            .upload(ctx.clone(), text("a.txt", "docs"), Bytes::from_static(b"secret"))
            .await
            .unwrap();
        let url = service
            .presigned_url(ctx.clone(), &file, Duration::ZERO)
            .await
            .unwrap();
        assert!(url.starts_with(&format!("{BASE}/{}/download?token=", file.id)), "{url}");

        let downloaded = service
            .download_with_token(ctx, &file, token_of(&url))
            .await
            .unwrap();
        assert_eq!(downloaded.data, Bytes::from_static(b"secret"));

        let stranger = ResolutionContext::new()
            .with_caller(AuthenticatedCaller::new("user-2", "org-1"));
        let err = service
            .download_with_token(stranger, &file, token_of(&url))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Presign(PresignError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_native_presign_when_proxy_off() {
        let dir = tempfile::tempdir().unwrap();
        let service =
            StorageService::from_config(&disk_config(dir.path(), false, LOCAL), memory()).unwrap();
        let file = service
            .upload(ResolutionContext::new(), text("a.txt", "docs"), Bytes::from_static(b"x"))
            .await
            .unwrap();

        let url = service
            .presigned_url(ResolutionContext::new(), &file, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(url, format!("{LOCAL}/docs/a.txt"));
    }

    #[tokio::test]
    async fn test_persistence_installed_late() {
        let dir = tempfile::tempdir().unwrap();
        let service =
            StorageService::from_config(&disk_config(dir.path(), true, ""), None).unwrap();
        let file = service
            .upload(ResolutionContext::new(), text("a.txt", "docs"), Bytes::from_static(b"x"))
            .await
            .unwrap();

        let err = service
            .presigned_url(ResolutionContext::new(), &file, Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Presign(PresignError::NoPersistenceClient)));

        assert!(service.set_persistence(Arc::new(MemoryPersistence::new())));
        assert!(!service.set_persistence(Arc::new(MemoryPersistence::new())));

        let url = service
            .presigned_url(ResolutionContext::new(), &file, Duration::ZERO)
            .await
            .unwrap();
        assert!(url.starts_with(BASE));
    }

    #[tokio::test]
    async fn test_database_backend() {
        let mut config = AppConfig::default();
        config.storage.providers.database.enabled = true;
        let service = StorageService::from_config(&config, memory()).unwrap();

        let file = service
            .upload(ResolutionContext::new(), text("a.txt", "docs"), Bytes::from_static(b"db"))
            .await
            .unwrap();
        assert_eq!(file.provider, Some(BackendKind::Database));
        assert!(file.full_uri.starts_with("db://"));

        let downloaded = service.download(ResolutionContext::new(), &file).await.unwrap();
        assert_eq!(downloaded.data, Bytes::from_static(b"db"));

        // No token issuer and no native presign: nothing to fall back to.
        let err = service
            .presigned_url(ResolutionContext::new(), &file, Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Presign(PresignError::NoTokenManager)));

        let err = service
            .download_with_token(ResolutionContext::new(), &file, "token")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::TokensDisabled));
    }

    #[tokio::test]
    async fn test_database_backend_recovers_after_persistence_installed() {
        let mut config = AppConfig::default();
        config.storage.providers.database.enabled = true;
        let service = StorageService::from_config(&config, None).unwrap();

        let err = service
            .upload(ResolutionContext::new(), text("a.txt", "docs"), Bytes::from_static(b"db"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Storage(StorageError::ClientUnavailable {
                kind: BackendKind::Database
            })
        ));

        assert!(service.set_persistence(Arc::new(MemoryPersistence::new())));

        let file = service
            .upload(ResolutionContext::new(), text("a.txt", "docs"), Bytes::from_static(b"db"))
            .await
            .unwrap();
        let downloaded = service.download(ResolutionContext::new(), &file).await.unwrap();
        assert_eq!(downloaded.data, Bytes::from_static(b"db"));
    }

    #[tokio::test]
    async fn test_availability() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = disk_config(dir.path(), false, "");
        config.storage.providers.s3 = ProviderSettings {
            enabled: true,
            bucket: "bucket".to_string(),
            ensure_available: true,
            ..Default::default()
        };
        let service = StorageService::from_config(&config, None).unwrap();

        let report = service.check_availability().await;
        assert_eq!(report.statuses().len(), 2);
        assert_eq!(report.statuses()[0].kind, BackendKind::S3);
        assert!(report.status(BackendKind::Disk).is_some_and(|s| s.available));

        let s3 = report.status(BackendKind::S3).unwrap();
        assert!(!s3.available);
        assert!(s3.error.as_deref().unwrap().contains("region"));

        let err = service.ensure_available().await.unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable { kind: BackendKind::S3, .. }));
    }

    struct FixedBuilder(Arc<dyn ProviderHandle>);

    impl ProviderBuilder for FixedBuilder {
        fn kind(&self) -> BackendKind {
            BackendKind::S3
        }

        fn build(
            &self,
            _ctx: &ResolutionContext,
            _credentials: &ProviderCredentials,
            _options: ProviderOptions,
        ) -> Result<Arc<dyn ProviderHandle>, BuildError> {
            Ok(Arc::clone(&self.0))
        }
    }

    fn mock_service(
        handle: MockProviderHandle,
        persistence: Option<Arc<dyn PersistenceClient>>,
    ) -> StorageService {
        let proxy = ProxyPresignConfig {
            base_url: BASE.to_string(),
            token_issuer: Some(Arc::new(TokenIssuer::new("iss", "aud"))),
        };
        let mut providers = ProvidersSettings::default();
        providers.s3 = ProviderSettings {
            enabled: true,
            bucket: "bucket".to_string(),
            region: "us-east-1".to_string(),
            proxy_presign_enabled: true,
            ..Default::default()
        };
        let settings = StorageSettings {
            providers: providers.clone(),
            ..Default::default()
        };
        let resolver = Resolver::from_settings(&settings, Some(proxy.clone())).unwrap();

        let mut registry = BuilderRegistry::new();
        registry
            .register(Arc::new(FixedBuilder(Arc::new(handle))))
            .unwrap();
        let clients = ClientService::new(Arc::new(ClientPool::default()), Arc::new(registry));
        let slot = Arc::new(persistence.map_or_else(PersistenceSlot::new, PersistenceSlot::with_client));
        let presigner = ProxyPresigner::new(Arc::clone(&slot));

        StorageService::new(resolver, clients, presigner, slot)
            .with_providers(providers)
            .with_proxy_presign(proxy)
    }

    fn s3_file(id: &str) -> StoredFile {
        StoredFile {
            id: id.to_string(),
            provider: Some(BackendKind::S3),
            bucket: "bucket".to_string(),
            key: "docs/a.pdf".to_string(),
            full_uri: "s3://bucket/docs/a.pdf".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_proxy_preferred_over_native() {
        let mut handle = MockProviderHandle::new();
        handle.expect_supports_presign().return_const(true);
        handle.expect_presigned_url().times(0);
        let service = mock_service(handle, memory());

        let url = service
            .presigned_url(ResolutionContext::new(), &s3_file("F1"), Duration::ZERO)
            .await
            .unwrap();
        assert!(url.starts_with(&format!("{BASE}/F1/download?token=")));
    }

    #[tokio::test]
    async fn test_falls_back_to_native_without_persistence() {
        let mut handle = MockProviderHandle::new();
        handle.expect_supports_presign().return_const(true);
        handle
            .expect_presigned_url()
            .times(1)
            .returning(|_, expires_in| {
                assert_eq!(expires_in, DEFAULT_PRESIGN_DURATION);
                Ok("https://bucket.s3.amazonaws.com/docs/a.pdf?sig".to_string())
            });
        let service = mock_service(handle, None);

        let url = service
            .presigned_url(ResolutionContext::new(), &s3_file("F1"), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(url, "https://bucket.s3.amazonaws.com/docs/a.pdf?sig");
    }

    #[tokio::test]
    async fn test_hard_presign_error_does_not_fall_back() {
        let mut handle = MockProviderHandle::new();
        handle.expect_supports_presign().return_const(true);
        handle.expect_presigned_url().times(0);
        let service = mock_service(handle, memory());

        let err = service
            .presigned_url(ResolutionContext::new(), &s3_file(""), Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Presign(PresignError::MissingFileId)));
    }

    #[tokio::test]
    async fn test_backend_error_propagates_unchanged() {
        let mut handle = MockProviderHandle::new();
        handle
            .expect_download()
            .returning(|file| Err(StorageError::not_found(file.key.clone())));
        let service = mock_service(handle, None);

        let err = service
            .download(ResolutionContext::new(), &s3_file("F1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Storage(StorageError::NotFound { ref key }) if key == "docs/a.pdf"));
    }

    #[test]
    fn test_describe_includes_cause() {
        let err = ServiceError::from(ResolveError::ProviderDisabled(BackendKind::R2));
        assert_eq!(
            describe(&err),
            "failed to resolve storage provider: storage provider r2 is disabled"
        );
    }
}
