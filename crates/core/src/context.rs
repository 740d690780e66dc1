//! Request-scoped resolution context.
//!
//! A context is built once per request and never mutated. Every `with_*`
//! method consumes the value and returns an enriched one, so earlier layers
//! stay visible to later readers.

use std::fmt;
use std::sync::Arc;

use stowage_shared::AuthenticatedCaller;

use crate::persistence::{PersistenceClient, PersistenceSlot};
use crate::storage::{BackendKind, ProviderHints, StoredFile, UploadOptions};

/// Typed hints that steer provider resolution.
#[derive(Clone, Default)]
pub struct ResolutionContext {
    tenant_id: Option<String>,
    caller: Option<AuthenticatedCaller>,
    known_provider: Option<BackendKind>,
    module: Option<String>,
    template_kind: Option<String>,
    upload: Option<UploadOptions>,
    file_id: Option<String>,
    persistence: Option<Arc<dyn PersistenceClient>>,
    persistence_slot: Option<Arc<PersistenceSlot>>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl ResolutionContext {
    /// Empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tenant explicitly.
    #[must_use]
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Attach the authenticated caller.
    #[must_use]
    pub fn with_caller(mut self, caller: AuthenticatedCaller) -> Self {
        self.caller = Some(caller);
        self
    }

    /// Request a specific backend.
    #[must_use]
    pub fn with_known_provider(mut self, kind: BackendKind) -> Self {
        self.known_provider = Some(kind);
        self
    }

    /// Set the module classifier.
    #[must_use]
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Set the template-kind classifier.
    #[must_use]
    pub fn with_template_kind(mut self, template_kind: impl Into<String>) -> Self {
        self.template_kind = Some(template_kind.into());
        self
    }

    /// Attach upload options. Their hints apply where no explicit value is set.
    #[must_use]
    pub fn with_upload(mut self, upload: UploadOptions) -> Self {
        self.upload = Some(upload);
        self
    }

    /// Set the file identity.
    #[must_use]
    pub fn with_file_id(mut self, file_id: impl Into<String>) -> Self {
        self.file_id = Some(file_id.into());
        self
    }

    /// Attach the persistence client.
    #[must_use]
    pub fn with_persistence(mut self, persistence: Arc<dyn PersistenceClient>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Attach a slot the persistence client may be installed into later.
    #[must_use]
    pub fn with_persistence_slot(mut self, slot: Arc<PersistenceSlot>) -> Self {
        self.persistence_slot = Some(slot);
        self
    }

    /// Layer provider hints under any values already set.
    #[must_use]
    pub fn apply_hints(mut self, hints: &ProviderHints) -> Self {
        if self.known_provider.is_none() {
            self.known_provider = hints.known_provider;
        }
        if non_blank(self.module.as_deref()).is_none() {
            self.module.clone_from(&hints.module);
        }
        if non_blank(self.template_kind.as_deref()).is_none() {
            self.template_kind.clone_from(&hints.template_kind);
        }
        if non_blank(self.tenant_id.as_deref()).is_none() && hints.organization_id.is_some() {
            self.tenant_id.clone_from(&hints.organization_id);
        }
        self
    }

    /// Context that routes back to where a stored file lives.
    #[must_use]
    pub fn for_file(self, file: &StoredFile) -> Self {
        let mut ctx = self.with_file_id(file.id.clone());
        if let Some(kind) = file.provider {
            ctx = ctx.with_known_provider(kind);
        }
        ctx.apply_hints(&file.hints)
    }

    /// Tenant: explicit value, else caller organization, else upload hint.
    #[must_use]
    pub fn tenant(&self) -> Option<&str> {
        non_blank(self.tenant_id.as_deref())
            .or_else(|| self.caller.as_ref().and_then(AuthenticatedCaller::organization))
            .or_else(|| {
                non_blank(
                    self.upload
                        .as_ref()
                        .and_then(|u| u.hints.organization_id.as_deref()),
                )
            })
    }

    /// Authenticated caller.
    #[must_use]
    pub fn caller(&self) -> Option<&AuthenticatedCaller> {
        self.caller.as_ref()
    }

    /// Subject of the authenticated caller.
    #[must_use]
    pub fn subject_id(&self) -> Option<&str> {
        non_blank(self.caller.as_ref().map(|c| c.subject_id.as_str()))
    }

    /// Explicit backend preference, from the context or the upload hints.
    #[must_use]
    pub fn known_provider(&self) -> Option<BackendKind> {
        self.known_provider
            .or_else(|| self.upload.as_ref().and_then(|u| u.hints.known_provider))
    }

    /// Module classifier, from the context or the upload hints.
    #[must_use]
    pub fn module(&self) -> Option<&str> {
        non_blank(self.module.as_deref())
            .or_else(|| non_blank(self.upload.as_ref().and_then(|u| u.hints.module.as_deref())))
    }

    /// Template-kind classifier, from the context or the upload hints.
    #[must_use]
    pub fn template_kind(&self) -> Option<&str> {
        non_blank(self.template_kind.as_deref()).or_else(|| {
            non_blank(
                self.upload
                    .as_ref()
                    .and_then(|u| u.hints.template_kind.as_deref()),
            )
        })
    }

    /// Upload options.
    #[must_use]
    pub fn upload(&self) -> Option<&UploadOptions> {
        self.upload.as_ref()
    }

    /// File identity.
    #[must_use]
    pub fn file_id(&self) -> Option<&str> {
        non_blank(self.file_id.as_deref())
    }

    /// Persistence client.
    #[must_use]
    pub fn persistence(&self) -> Option<&Arc<dyn PersistenceClient>> {
        self.persistence.as_ref()
    }

    /// Shared persistence slot.
    #[must_use]
    pub fn persistence_slot(&self) -> Option<&Arc<PersistenceSlot>> {
        self.persistence_slot.as_ref()
    }
}

impl fmt::Debug for ResolutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionContext")
            .field("tenant_id", &self.tenant_id)
            .field("caller", &self.caller)
            .field("known_provider", &self.known_provider)
            .field("module", &self.module)
            .field("template_kind", &self.template_kind)
            .field("upload", &self.upload)
            .field("file_id", &self.file_id)
            .field("persistence", &self.persistence.is_some())
            .field("persistence_slot", &self.persistence_slot)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload_with_hints(hints: ProviderHints) -> UploadOptions {
        UploadOptions {
            file_name: "a.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            size: 10,
            folder: None,
            hints,
        }
    }

    #[test]
    fn test_enrichment_keeps_earlier_layers() {
        let base = ResolutionContext::new().with_module("trust_center_module");
        let enriched = base.clone().with_tenant("org-1");

        assert_eq!(base.tenant(), None);
        assert_eq!(enriched.tenant(), Some("org-1"));
        assert_eq!(enriched.module(), Some("trust_center_module"));
    }

    #[test]
    fn test_tenant_falls_back_to_caller_then_hints() {
        let hints = ProviderHints {
            organization_id: Some("org-hint".to_string()),
            ..Default::default()
        };
        let ctx = ResolutionContext::new().with_upload(upload_with_hints(hints));
        assert_eq!(ctx.tenant(), Some("org-hint"));

        let ctx = ctx.with_caller(AuthenticatedCaller::new("u1", "org-caller"));
        assert_eq!(ctx.tenant(), Some("org-caller"));
        assert_eq!(ctx.subject_id(), Some("u1"));

        let ctx = ctx.with_tenant("org-explicit");
        assert_eq!(ctx.tenant(), Some("org-explicit"));
    }

    #[test]
    fn test_upload_hints_fill_gaps() {
        let hints = ProviderHints {
            known_provider: Some(BackendKind::R2),
            module: Some("compliance_module".to_string()),
            template_kind: Some("trust_center_nda".to_string()),
            ..Default::default()
        };
        let ctx = ResolutionContext::new()
            .with_module("explicit")
            .with_upload(upload_with_hints(hints));

        assert_eq!(ctx.known_provider(), Some(BackendKind::R2));
        assert_eq!(ctx.module(), Some("explicit"));
        assert_eq!(ctx.template_kind(), Some("trust_center_nda"));
    }

    #[test]
    fn test_blank_values_are_absent() {
        let ctx = ResolutionContext::new()
            .with_module("  ")
            .with_file_id("")
            .with_tenant(" ");
        assert_eq!(ctx.module(), None);
        assert_eq!(ctx.file_id(), None);
        assert_eq!(ctx.tenant(), None);
    }

    #[test]
    fn test_for_file_routes_back() {
        let file = StoredFile {
            id: "F1".to_string(),
            provider: Some(BackendKind::Disk),
            hints: ProviderHints {
                module: Some("trust_center_module".to_string()),
                organization_id: Some("org-1".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let ctx = ResolutionContext::new().for_file(&file);
        assert_eq!(ctx.file_id(), Some("F1"));
        assert_eq!(ctx.known_provider(), Some(BackendKind::Disk));
        assert_eq!(ctx.module(), Some("trust_center_module"));
        assert_eq!(ctx.tenant(), Some("org-1"));
    }
}
