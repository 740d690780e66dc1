//! Standard rule set built from configuration.

use std::sync::Arc;

use stowage_shared::{ProviderSettings, ProvidersSettings, RouteSettings, StorageSettings};

use super::{ResolveError, ResolvedProvider, Resolver, Rule};
use crate::context::ResolutionContext;
use crate::storage::providers::{DEFAULT_DISK_BASE_PATH, R2_REGION, r2_endpoint};
use crate::storage::{BackendKind, ProviderCredentials, ProviderOptions, ProxyPresignConfig};

/// Local URL files are served under in dev mode.
pub const DEFAULT_LOCAL_URL: &str = "http://localhost:17608/v1/files";

/// Canned disk options used when dev mode is on.
#[must_use]
pub fn dev_mode_options(proxy: Option<&ProxyPresignConfig>) -> ProviderOptions {
    ProviderOptions::new()
        .with_bucket(DEFAULT_DISK_BASE_PATH)
        .with_base_path(DEFAULT_DISK_BASE_PATH)
        .with_endpoint(DEFAULT_LOCAL_URL)
        .with_local_url(DEFAULT_LOCAL_URL)
        .with_proxy_presign_enabled(true)
        .with_proxy_presign(ProxyPresignConfig {
            base_url: DEFAULT_LOCAL_URL.to_string(),
            token_issuer: proxy.and_then(|p| p.token_issuer.clone()),
        })
        .with_extra("dev_mode", true)
}

pub(crate) fn settings_for(kind: BackendKind, providers: &ProvidersSettings) -> &ProviderSettings {
    match kind {
        BackendKind::S3 => &providers.s3,
        BackendKind::R2 => &providers.r2,
        BackendKind::Disk => &providers.disk,
        BackendKind::Database => &providers.database,
    }
}

fn is_enabled(kind: BackendKind, providers: &ProvidersSettings) -> bool {
    settings_for(kind, providers).enabled
}

/// Build credentials and options for a backend from its configuration block.
///
/// Disk reads its bucket as the base path and its endpoint as the local URL.
/// R2 defaults the region to `auto` and derives the endpoint from the account.
/// Proxy presign parameters are attached only when a token issuer exists.
pub fn resolve_provider_from_config(
    kind: BackendKind,
    providers: &ProvidersSettings,
    proxy: Option<&ProxyPresignConfig>,
) -> Result<ResolvedProvider, ResolveError> {
    let settings = settings_for(kind, providers);
    if !settings.enabled {
        return Err(ResolveError::ProviderDisabled(kind));
    }

    let credentials = ProviderCredentials {
        bucket: settings.bucket.trim().to_string(),
        region: settings.region.trim().to_string(),
        account_id: settings.account_id.trim().to_string(),
        access_key_id: settings.access_key_id.trim().to_string(),
        secret_access_key: settings.secret_access_key.trim().to_string(),
        endpoint: settings.endpoint.trim().to_string(),
    };

    let mut options = ProviderOptions::new()
        .with_bucket(credentials.bucket.clone())
        .with_region(credentials.region.clone())
        .with_endpoint(credentials.endpoint.clone())
        .with_proxy_presign_enabled(settings.proxy_presign_enabled);

    match kind {
        BackendKind::Disk => {
            let base = if credentials.bucket.is_empty() {
                DEFAULT_DISK_BASE_PATH.to_string()
            } else {
                credentials.bucket.clone()
            };
            options = options
                .with_bucket(base.clone())
                .with_base_path(base)
                .with_local_url(credentials.endpoint.clone());
        }
        BackendKind::R2 => {
            if options.region.is_empty() {
                options.region = R2_REGION.to_string();
            }
            if options.endpoint.is_empty() && !credentials.account_id.is_empty() {
                options.endpoint = r2_endpoint(&credentials.account_id);
            }
        }
        BackendKind::S3 | BackendKind::Database => {}
    }

    if let Some(proxy) = proxy.filter(|p| p.token_issuer.is_some()) {
        options = options.with_proxy_presign(proxy.clone());
    }

    Ok(ResolvedProvider {
        kind,
        credentials,
        options,
    })
}

/// Resolution bound to one backend, owned by a rule.
struct ResolveWith {
    kind: BackendKind,
    providers: Arc<ProvidersSettings>,
    proxy: Option<Arc<ProxyPresignConfig>>,
}

impl ResolveWith {
    fn resolve(&self) -> Result<ResolvedProvider, ResolveError> {
        resolve_provider_from_config(self.kind, &self.providers, self.proxy.as_deref())
    }
}

/// Installs the standard rules on a resolver.
struct RuleCoordinator {
    providers: Arc<ProvidersSettings>,
    proxy: Option<Arc<ProxyPresignConfig>>,
}

impl RuleCoordinator {
    fn resolve_with(&self, kind: BackendKind) -> ResolveWith {
        ResolveWith {
            kind,
            providers: Arc::clone(&self.providers),
            proxy: self.proxy.clone(),
        }
    }

    fn dev_mode_rule(&self) -> Rule {
        let template = ResolvedProvider {
            kind: BackendKind::Disk,
            credentials: ProviderCredentials::default(),
            options: dev_mode_options(self.proxy.as_deref()),
        };
        Rule::new("dev_mode", |_| true, move |_| Ok(template.clone()))
    }

    fn known_provider_rule(&self) -> Rule {
        let providers = Arc::clone(&self.providers);
        let resolve_providers = Arc::clone(&self.providers);
        let proxy = self.proxy.clone();
        Rule::new(
            "known_provider",
            move |ctx| {
                ctx.known_provider()
                    .is_some_and(|kind| is_enabled(kind, &providers))
            },
            move |ctx| match ctx.known_provider() {
                Some(kind) => resolve_provider_from_config(kind, &resolve_providers, proxy.as_deref()),
                None => Err(ResolveError::NoMatch),
            },
        )
    }

    /// Parse routes, keeping only those whose hint is non-empty and backend enabled.
    fn routes(&self, routes: &[RouteSettings]) -> Result<Vec<(String, BackendKind)>, ResolveError> {
        let mut parsed = Vec::with_capacity(routes.len());
        for route in routes {
            let kind: BackendKind = route
                .provider
                .parse()
                .map_err(|_| ResolveError::UnsupportedProvider(route.provider.clone()))?;
            let hint = route.hint.trim();
            if hint.is_empty() || !is_enabled(kind, &self.providers) {
                continue;
            }
            parsed.push((hint.to_string(), kind));
        }
        Ok(parsed)
    }

    fn template_rule(&self, template_kind: String, kind: BackendKind) -> Rule {
        let resolve = self.resolve_with(kind);
        Rule::new(
            format!("template:{template_kind}"),
            move |ctx| ctx.template_kind() == Some(template_kind.as_str()),
            move |_: &ResolutionContext| resolve.resolve(),
        )
    }

    fn module_rule(&self, module: String, kind: BackendKind) -> Rule {
        let resolve = self.resolve_with(kind);
        Rule::new(
            format!("module:{module}"),
            move |ctx| ctx.module() == Some(module.as_str()),
            move |_: &ResolutionContext| resolve.resolve(),
        )
    }

    fn default_rule(&self) -> Option<Rule> {
        let kind = BackendKind::PREFERENCE_ORDER
            .into_iter()
            .find(|kind| is_enabled(*kind, &self.providers))?;
        let resolve = self.resolve_with(kind);
        Some(Rule::new(
            format!("default:{kind}"),
            |_| true,
            move |_: &ResolutionContext| resolve.resolve(),
        ))
    }
}

impl Resolver {
    /// Resolver with the standard rule set.
    ///
    /// In dev mode a single rule routes everything to local disk. Otherwise
    /// rules are, in order: known provider, template routes, module routes,
    /// then the first enabled backend in preference order.
    pub fn from_settings(
        settings: &StorageSettings,
        proxy: Option<ProxyPresignConfig>,
    ) -> Result<Self, ResolveError> {
        let coordinator = RuleCoordinator {
            providers: Arc::new(settings.providers.clone()),
            proxy: proxy.map(Arc::new),
        };
        let mut resolver = Self::new();

        if settings.dev_mode {
            resolver.add_rule(coordinator.dev_mode_rule());
            tracing::info!("storage dev mode enabled, routing all files to local disk");
            return Ok(resolver);
        }

        resolver.add_rule(coordinator.known_provider_rule());
        for (hint, kind) in coordinator.routes(&settings.template_routes)? {
            resolver.add_rule(coordinator.template_rule(hint, kind));
        }
        for (hint, kind) in coordinator.routes(&settings.module_routes)? {
            resolver.add_rule(coordinator.module_rule(hint, kind));
        }
        if let Some(rule) = coordinator.default_rule() {
            resolver.add_rule(rule);
        }

        tracing::debug!(rules = resolver.len(), "storage resolver configured");
        Ok(resolver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presign::TokenIssuer;
    use rstest::rstest;
    use serde_json::Value;

    fn enabled(bucket: &str) -> ProviderSettings {
        ProviderSettings {
            enabled: true,
            bucket: bucket.to_string(),
            ..Default::default()
        }
    }

    fn settings(providers: ProvidersSettings) -> StorageSettings {
        StorageSettings {
            providers,
            ..Default::default()
        }
    }

    fn proxy() -> ProxyPresignConfig {
        ProxyPresignConfig {
            base_url: "https://api.example.com/v1/files".to_string(),
            token_issuer: Some(Arc::new(TokenIssuer::new("iss", "aud"))),
        }
    }

    #[test]
    fn test_module_routes_to_r2_when_s3_disabled() {
        let resolver = Resolver::from_settings(
            &settings(ProvidersSettings {
                r2: enabled("tc-bucket"),
                ..Default::default()
            }),
            None,
        )
        .unwrap();

        let ctx = ResolutionContext::new().with_module("trust_center_module");
        let resolved = resolver.resolve(&ctx).unwrap();
        assert_eq!(resolved.kind, BackendKind::R2);
        assert_eq!(resolved.options.bucket, "tc-bucket");
        assert_eq!(resolved.options.region, R2_REGION);
    }

    #[test]
    fn test_dev_mode_short_circuits() {
        let resolver = Resolver::from_settings(
            &StorageSettings {
                dev_mode: true,
                providers: ProvidersSettings {
                    s3: enabled("s3-bucket"),
                    ..Default::default()
                },
                ..Default::default()
            },
            None,
        )
        .unwrap();
        assert_eq!(resolver.len(), 1);

        let ctx = ResolutionContext::new()
            .with_known_provider(BackendKind::S3)
            .with_module("compliance_module");
        let resolved = resolver.resolve(&ctx).unwrap();
        assert_eq!(resolved.kind, BackendKind::Disk);
        assert_eq!(resolved.options.base_path, DEFAULT_DISK_BASE_PATH);
        assert_eq!(resolved.options.local_url, DEFAULT_LOCAL_URL);
        assert!(resolved.options.proxy_presign_enabled);
        assert_eq!(resolved.options.extra("dev_mode"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_dev_mode_returns_fresh_copies() {
        let resolver = Resolver::from_settings(
            &StorageSettings {
                dev_mode: true,
                ..Default::default()
            },
            None,
        )
        .unwrap();

        let mut first = resolver.resolve(&ResolutionContext::new()).unwrap();
        first.options.set_extra("mutated", true);
        first.options.bucket = "changed".to_string();

        let second = resolver.resolve(&ResolutionContext::new()).unwrap();
        assert!(second.options.extra("mutated").is_none());
        assert_eq!(second.options.bucket, DEFAULT_DISK_BASE_PATH);
    }

    #[rstest]
    #[case::all(true, true, true, true, BackendKind::S3)]
    #[case::no_s3(false, true, true, true, BackendKind::R2)]
    #[case::disk_and_db(false, false, true, true, BackendKind::Disk)]
    #[case::db_only(false, false, false, true, BackendKind::Database)]
    fn test_default_order(
        #[case] s3: bool,
        #[case] r2: bool,
        #[case] disk: bool,
        #[case] database: bool,
        #[case] expected: BackendKind,
    ) {
        let block = |on: bool| ProviderSettings {
            enabled: on,
            ..Default::default()
        };
        let resolver = Resolver::from_settings(
            &settings(ProvidersSettings {
                s3: block(s3),
                r2: block(r2),
                disk: block(disk),
                database: block(database),
            }),
            None,
        )
        .unwrap();
        let resolved = resolver.resolve(&ResolutionContext::new()).unwrap();
        assert_eq!(resolved.kind, expected);
    }

    #[test]
    fn test_nothing_enabled_has_no_match() {
        let resolver = Resolver::from_settings(&StorageSettings::default(), None).unwrap();
        assert_eq!(
            resolver.resolve(&ResolutionContext::new()),
            Err(ResolveError::NoMatch)
        );
    }

    #[test]
    fn test_known_provider_wins_over_module() {
        let resolver = Resolver::from_settings(
            &settings(ProvidersSettings {
                r2: enabled("r2"),
                disk: enabled("/tmp/x"),
                ..Default::default()
            }),
            None,
        )
        .unwrap();
        let ctx = ResolutionContext::new()
            .with_known_provider(BackendKind::Disk)
            .with_module("trust_center_module");
        assert_eq!(resolver.resolve(&ctx).unwrap().kind, BackendKind::Disk);
    }

    #[test]
    fn test_disabled_known_provider_falls_through() {
        let resolver = Resolver::from_settings(
            &settings(ProvidersSettings {
                disk: enabled("/tmp/x"),
                ..Default::default()
            }),
            None,
        )
        .unwrap();
        let ctx = ResolutionContext::new().with_known_provider(BackendKind::S3);
        assert_eq!(resolver.resolve(&ctx).unwrap().kind, BackendKind::Disk);
    }

    #[test]
    fn test_template_rule() {
        let resolver = Resolver::from_settings(
            &settings(ProvidersSettings {
                s3: enabled("s3"),
                r2: enabled("r2"),
                ..Default::default()
            }),
            None,
        )
        .unwrap();
        let ctx = ResolutionContext::new().with_template_kind("trust_center_nda");
        assert_eq!(resolver.resolve(&ctx).unwrap().kind, BackendKind::R2);

        let ctx = ResolutionContext::new().with_template_kind("other");
        assert_eq!(resolver.resolve(&ctx).unwrap().kind, BackendKind::S3);
    }

    #[test]
    fn test_routes_to_disabled_backend_are_not_installed() {
        let resolver = Resolver::from_settings(
            &settings(ProvidersSettings {
                s3: enabled("s3"),
                ..Default::default()
            }),
            None,
        )
        .unwrap();
        let names: Vec<_> = resolver.rule_names().collect();
        assert_eq!(names, vec!["known_provider", "module:compliance_module", "default:s3"]);
    }

    #[test]
    fn test_unknown_route_provider_is_rejected() {
        let mut storage = settings(ProvidersSettings {
            s3: enabled("s3"),
            ..Default::default()
        });
        storage.module_routes = vec![RouteSettings::new("m", "gcs")];
        let err = Resolver::from_settings(&storage, None).unwrap_err();
        assert_eq!(err, ResolveError::UnsupportedProvider("gcs".to_string()));
    }

    #[test]
    fn test_disk_maps_bucket_and_endpoint() {
        let providers = ProvidersSettings {
            disk: ProviderSettings {
                enabled: true,
                bucket: "/var/files".to_string(),
                endpoint: "https://files.example.com".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let resolved = resolve_provider_from_config(BackendKind::Disk, &providers, None).unwrap();
        assert_eq!(resolved.options.base_path, "/var/files");
        assert_eq!(resolved.options.local_url, "https://files.example.com");
    }

    #[test]
    fn test_r2_endpoint_derived() {
        let providers = ProvidersSettings {
            r2: ProviderSettings {
                enabled: true,
                account_id: "acct".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let resolved = resolve_provider_from_config(BackendKind::R2, &providers, None).unwrap();
        assert_eq!(resolved.options.endpoint, "https://acct.r2.cloudflarestorage.com");
    }

    #[test]
    fn test_proxy_attached_only_with_issuer() {
        let providers = ProvidersSettings {
            s3: enabled("s3"),
            ..Default::default()
        };
        let with_issuer =
            resolve_provider_from_config(BackendKind::S3, &providers, Some(&proxy())).unwrap();
        assert_eq!(
            with_issuer.options.proxy_presign.as_ref().and_then(|p| p.issuer()),
            Some("iss")
        );

        let without_issuer = ProxyPresignConfig {
            base_url: "https://api.example.com".to_string(),
            token_issuer: None,
        };
        let resolved =
            resolve_provider_from_config(BackendKind::S3, &providers, Some(&without_issuer))
                .unwrap();
        assert!(resolved.options.proxy_presign.is_none());
    }

    #[test]
    fn test_disabled_backend_is_an_error() {
        let err = resolve_provider_from_config(BackendKind::S3, &ProvidersSettings::default(), None)
            .unwrap_err();
        assert_eq!(err, ResolveError::ProviderDisabled(BackendKind::S3));
    }
}
