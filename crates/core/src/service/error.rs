//! Orchestration service errors.

use stowage_shared::AppError;
use thiserror::Error;

use crate::client::ClientError;
use crate::presign::PresignError;
use crate::resolver::ResolveError;
use crate::storage::{BackendKind, StorageError};

/// Why no provider handle could be obtained.
#[derive(Debug, Error)]
pub enum ResolutionFailure {
    /// No rule resolved the context.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// A provider was resolved but no client could be built for it.
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Errors surfaced by [`super::StorageService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No provider could be resolved or built for the request.
    #[error("failed to resolve storage provider")]
    ProviderResolutionFailed(#[source] ResolutionFailure),

    /// Backend operation failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Proxy presign failed.
    #[error(transparent)]
    Presign(#[from] PresignError),

    /// Proxy downloads need a token issuer and none is configured.
    #[error("proxy download tokens are not configured")]
    TokensDisabled,

    /// A backend flagged as required is unreachable.
    #[error("{kind} storage is unavailable: {message}")]
    Unavailable {
        /// Unreachable backend.
        kind: BackendKind,
        /// Probe failure.
        message: String,
    },
}

impl From<ResolveError> for ServiceError {
    fn from(err: ResolveError) -> Self {
        Self::ProviderResolutionFailed(err.into())
    }
}

impl From<ClientError> for ServiceError {
    fn from(err: ClientError) -> Self {
        Self::ProviderResolutionFailed(err.into())
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::ProviderResolutionFailed(cause) => {
                Self::ProviderResolution(cause.to_string())
            }
            ServiceError::Storage(err) => match err {
                StorageError::NotFound { .. } => Self::NotFound(err.to_string()),
                StorageError::FileTooLarge { .. }
                | StorageError::InvalidMimeType { .. }
                | StorageError::InvalidKey(_) => Self::Validation(err.to_string()),
                StorageError::ClientUnavailable { .. } => Self::Unavailable(err.to_string()),
                StorageError::Operation(_) | StorageError::Persistence(_) => {
                    Self::ExternalService(err.to_string())
                }
                StorageError::PresignNotSupported { .. } | StorageError::Configuration(_) => {
                    Self::Internal(err.to_string())
                }
            },
            ServiceError::Presign(err) => match err {
                PresignError::TokenNotFound
                | PresignError::TokenMismatch
                | PresignError::EmptySecret
                | PresignError::Expired
                | PresignError::InvalidSignature => Self::Unauthorized(err.to_string()),
                PresignError::Unauthorized => Self::Forbidden(err.to_string()),
                PresignError::MissingFileId | PresignError::MissingObjectUri => {
                    Self::Validation(err.to_string())
                }
                PresignError::NoPersistenceClient | PresignError::Timeout(_) => {
                    Self::Unavailable(err.to_string())
                }
                PresignError::Persistence(_) => Self::ExternalService(err.to_string()),
                _ => Self::Internal(err.to_string()),
            },
            ServiceError::TokensDisabled => Self::Internal(err.to_string()),
            ServiceError::Unavailable { .. } => Self::Unavailable(err.to_string()),
        }
    }
}
