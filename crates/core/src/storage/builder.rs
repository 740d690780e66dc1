//! Provider builders and the kind-keyed builder registry.

use std::collections::HashMap;
use std::sync::Arc;

use super::config::{ProviderCredentials, ProviderOptions};
use super::error::BuildError;
use super::provider::ProviderHandle;
use super::providers::{DatabaseBuilder, DiskBuilder, R2Builder, S3Builder};
use super::types::BackendKind;
use crate::context::ResolutionContext;

/// Constructs a live handle for one backend kind.
///
/// Builders never perform network I/O. The disk builder may create its root
/// directory; nothing else has side effects.
pub trait ProviderBuilder: Send + Sync {
    /// Backend this builder produces.
    fn kind(&self) -> BackendKind;

    /// Validate the inputs and build a handle.
    fn build(
        &self,
        ctx: &ResolutionContext,
        credentials: &ProviderCredentials,
        options: ProviderOptions,
    ) -> Result<Arc<dyn ProviderHandle>, BuildError>;
}

/// Error returned when a kind already has a builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("builder for {0} is already registered")]
pub struct DuplicateBuilder(pub BackendKind);

/// Map of backend kind to builder, fixed at composition time.
#[derive(Default)]
pub struct BuilderRegistry {
    builders: HashMap<BackendKind, Arc<dyn ProviderBuilder>>,
}

impl BuilderRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the four standard builders.
    #[must_use]
    pub fn with_defaults() -> Self {
        let builders: [Arc<dyn ProviderBuilder>; 4] = [
            Arc::new(S3Builder::new()),
            Arc::new(R2Builder),
            Arc::new(DiskBuilder),
            Arc::new(DatabaseBuilder),
        ];
        Self {
            builders: builders.into_iter().map(|b| (b.kind(), b)).collect(),
        }
    }

    /// Register a builder. Each kind may be registered once.
    pub fn register(&mut self, builder: Arc<dyn ProviderBuilder>) -> Result<(), DuplicateBuilder> {
        let kind = builder.kind();
        if self.builders.contains_key(&kind) {
            return Err(DuplicateBuilder(kind));
        }
        self.builders.insert(kind, builder);
        Ok(())
    }

    /// Builder for a kind.
    #[must_use]
    pub fn get(&self, kind: BackendKind) -> Option<&Arc<dyn ProviderBuilder>> {
        self.builders.get(&kind)
    }

    /// Whether a kind has a builder.
    #[must_use]
    pub fn contains(&self, kind: BackendKind) -> bool {
        self.builders.contains_key(&kind)
    }
}

impl std::fmt::Debug for BuilderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.builders.keys().copied().collect();
        kinds.sort();
        f.debug_struct("BuilderRegistry").field("kinds", &kinds).finish()
    }
}
