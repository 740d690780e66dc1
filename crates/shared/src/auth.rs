//! Authenticated caller identity.

use serde::{Deserialize, Serialize};

/// Identity of the authenticated caller for the current request.
///
/// Produced by the host's authentication layer; the storage core only reads it
/// to pick a tenant and to bind download tokens to a subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthenticatedCaller {
    /// Subject (user or service account) identifier.
    pub subject_id: String,
    /// Organization the subject is acting in, if any.
    pub organization_id: Option<String>,
}

impl AuthenticatedCaller {
    /// Creates a caller acting inside an organization.
    #[must_use]
    pub fn new(subject_id: impl Into<String>, organization_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            organization_id: Some(organization_id.into()),
        }
    }

    /// Creates a caller without organization context.
    #[must_use]
    pub fn subject_only(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            organization_id: None,
        }
    }

    /// Returns the organization ID if present and non-blank.
    #[must_use]
    pub fn organization(&self) -> Option<&str> {
        self.organization_id
            .as_deref()
            .map(str::trim)
            .filter(|org| !org.is_empty())
    }
}
