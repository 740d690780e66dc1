//! Backend availability results.

use serde::Serialize;

use crate::storage::BackendKind;

/// Probe outcome for one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    /// Backend probed.
    pub kind: BackendKind,
    /// Whether the probe succeeded.
    pub available: bool,
    /// Whether the backend is flagged as required.
    pub required: bool,
    /// Failure message.
    pub error: Option<String>,
}

impl ProviderStatus {
    pub(crate) fn up(kind: BackendKind, required: bool) -> Self {
        Self {
            kind,
            available: true,
            required,
            error: None,
        }
    }

    pub(crate) fn down(kind: BackendKind, required: bool, error: impl ToString) -> Self {
        Self {
            kind,
            available: false,
            required,
            error: Some(error.to_string()),
        }
    }
}

/// Probe outcomes for every enabled backend, in preference order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AvailabilityReport {
    statuses: Vec<ProviderStatus>,
}

impl AvailabilityReport {
    pub(crate) fn new(statuses: Vec<ProviderStatus>) -> Self {
        Self { statuses }
    }

    /// Per-backend outcomes.
    #[must_use]
    pub fn statuses(&self) -> &[ProviderStatus] {
        &self.statuses
    }

    /// Outcome for one backend, if it was probed.
    #[must_use]
    pub fn status(&self, kind: BackendKind) -> Option<&ProviderStatus> {
        self.statuses.iter().find(|s| s.kind == kind)
    }

    /// True when every probed backend is reachable.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.statuses.iter().all(|s| s.available)
    }

    /// First required backend that is unreachable.
    #[must_use]
    pub fn required_failure(&self) -> Option<&ProviderStatus> {
        self.statuses.iter().find(|s| s.required && !s.available)
    }
}
