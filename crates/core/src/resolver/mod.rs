//! Ordered rule chain that picks a storage backend for a request.
//!
//! Rules are evaluated strictly in insertion order. The first rule whose
//! predicate matches resolves the request; its error, if any, is returned
//! as-is and later rules are never consulted.

mod rules;

use std::fmt;

use thiserror::Error;

use crate::context::ResolutionContext;
use crate::storage::{BackendKind, ProviderCredentials, ProviderOptions};

pub use rules::{DEFAULT_LOCAL_URL, dev_mode_options, resolve_provider_from_config};
pub(crate) use rules::settings_for;

/// Resolution errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No rule matched the context.
    #[error("no storage provider rule matched")]
    NoMatch,

    /// A matched rule names a backend that is disabled.
    #[error("storage provider {0} is disabled")]
    ProviderDisabled(BackendKind),

    /// A route names a backend this crate does not know.
    #[error("unsupported storage provider: {0}")]
    UnsupportedProvider(String),

    /// A custom rule failed.
    #[error("rule '{rule}' failed: {message}")]
    RuleFailed {
        /// Rule name.
        rule: String,
        /// Failure message.
        message: String,
    },
}

/// The outcome of resolution: which backend, with what credentials and options.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProvider {
    /// Backend kind.
    pub kind: BackendKind,
    /// Credentials.
    pub credentials: ProviderCredentials,
    /// Options. Always a copy the caller owns.
    pub options: ProviderOptions,
}

type Predicate = Box<dyn Fn(&ResolutionContext) -> bool + Send + Sync>;
type ResolveFn = Box<dyn Fn(&ResolutionContext) -> Result<ResolvedProvider, ResolveError> + Send + Sync>;

/// A predicate paired with a resolution function.
pub struct Rule {
    name: String,
    predicate: Predicate,
    resolve: ResolveFn,
}

impl Rule {
    /// Creates a named rule.
    pub fn new<P, R>(name: impl Into<String>, predicate: P, resolve: R) -> Self
    where
        P: Fn(&ResolutionContext) -> bool + Send + Sync + 'static,
        R: Fn(&ResolutionContext) -> Result<ResolvedProvider, ResolveError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Box::new(predicate),
            resolve: Box::new(resolve),
        }
    }

    /// Rule name, used in logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Ordered list of rules.
#[derive(Debug, Default)]
pub struct Resolver {
    rules: Vec<Rule>,
}

impl Resolver {
    /// Resolver with no rules. Every resolution fails with [`ResolveError::NoMatch`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule. It is consulted after every rule added before it.
    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Number of installed rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rules are installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Names of installed rules, in evaluation order.
    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(Rule::name)
    }

    /// Resolve a context to a backend.
    pub fn resolve(&self, ctx: &ResolutionContext) -> Result<ResolvedProvider, ResolveError> {
        let rule = self
            .rules
            .iter()
            .find(|rule| (rule.predicate)(ctx))
            .ok_or(ResolveError::NoMatch)?;

        match (rule.resolve)(ctx) {
            Ok(resolved) => {
                tracing::debug!(rule = %rule.name, provider = %resolved.kind, "resolved storage provider");
                Ok(resolved)
            }
            Err(err) => {
                tracing::warn!(rule = %rule.name, error = %err, "storage provider rule failed");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(kind: BackendKind) -> impl Fn(&ResolutionContext) -> Result<ResolvedProvider, ResolveError> {
        move |_| {
            Ok(ResolvedProvider {
                kind,
                credentials: ProviderCredentials::default(),
                options: ProviderOptions::new(),
            })
        }
    }

    #[test]
    fn test_empty_resolver_has_no_match() {
        let resolver = Resolver::new();
        assert!(resolver.is_empty());
        assert_eq!(
            resolver.resolve(&ResolutionContext::new()),
            Err(ResolveError::NoMatch)
        );
    }

    #[test]
    fn test_first_match_wins() {
        let mut resolver = Resolver::new();
        resolver.add_rule(Rule::new("s3", |_| true, fixed(BackendKind::S3)));
        resolver.add_rule(Rule::new("r2", |_| true, fixed(BackendKind::R2)));
        let resolved = resolver.resolve(&ResolutionContext::new()).unwrap();
        assert_eq!(resolved.kind, BackendKind::S3);
    }

    #[test]
    fn test_reordering_changes_outcome() {
        let mut resolver = Resolver::new();
        resolver.add_rule(Rule::new("r2", |_| true, fixed(BackendKind::R2)));
        resolver.add_rule(Rule::new("s3", |_| true, fixed(BackendKind::S3)));
        let resolved = resolver.resolve(&ResolutionContext::new()).unwrap();
        assert_eq!(resolved.kind, BackendKind::R2);
        assert_eq!(resolver.rule_names().collect::<Vec<_>>(), vec!["r2", "s3"]);
    }

    #[test]
    fn test_matched_failure_does_not_fall_through() {
        let mut resolver = Resolver::new();
        resolver.add_rule(Rule::new(
            "broken",
            |_| true,
            |_| Err(ResolveError::ProviderDisabled(BackendKind::R2)),
        ));
        resolver.add_rule(Rule::new("s3", |_| true, fixed(BackendKind::S3)));
        assert_eq!(
            resolver.resolve(&ResolutionContext::new()),
            Err(ResolveError::ProviderDisabled(BackendKind::R2))
        );
    }

    #[test]
    fn test_predicate_filters() {
        let mut resolver = Resolver::new();
        resolver.add_rule(Rule::new(
            "module",
            |ctx| ctx.module() == Some("m"),
            fixed(BackendKind::R2),
        ));
        resolver.add_rule(Rule::new("default", |_| true, fixed(BackendKind::Disk)));

        let ctx = ResolutionContext::new().with_module("m");
        assert_eq!(resolver.resolve(&ctx).unwrap().kind, BackendKind::R2);
        assert_eq!(
            resolver.resolve(&ResolutionContext::new()).unwrap().kind,
            BackendKind::Disk
        );
    }
}
