//! Proxy presign error types.

use std::time::Duration;

use thiserror::Error;

use crate::persistence::PersistenceError;

/// Errors raised while issuing or redeeming download tokens.
#[derive(Debug, Error)]
pub enum PresignError {
    /// The file has no identifier.
    #[error("file identifier is required")]
    MissingFileId,

    /// The file has no object locator.
    #[error("object URI is required")]
    MissingObjectUri,

    /// Secret material has the wrong length.
    #[error("download secret must be {expected} bytes, got {actual}")]
    InvalidSecretLength {
        /// Required length.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },

    /// No token-issuing authority is configured.
    #[error("proxy presign token issuer is not configured")]
    NoTokenManager,

    /// No persistence client is installed.
    #[error("proxy presign persistence client is not available")]
    NoPersistenceClient,

    /// No base URL is configured for download links.
    #[error("proxy presign base URL is not configured")]
    MissingBaseUrl,

    /// The requested lifetime cannot be represented.
    #[error("presign duration is out of range")]
    InvalidDuration,

    /// Payload encoding failed.
    #[error("failed to encode download token: {0}")]
    Encoding(String),

    /// Persistence round-trip failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Persistence round-trip exceeded the configured timeout.
    #[error("persistence timed out after {0:?}")]
    Timeout(Duration),

    /// No record exists for the file and token.
    #[error("download token not found")]
    TokenNotFound,

    /// The stored token differs from the presented one.
    #[error("download token mismatch")]
    TokenMismatch,

    /// The stored record carries no secret.
    #[error("download token secret is missing")]
    EmptySecret,

    /// The token has expired.
    #[error("download token has expired")]
    Expired,

    /// The caller is not the subject the token is bound to.
    #[error("download token is bound to another user")]
    Unauthorized,

    /// The token signature does not match the payload.
    #[error("invalid download token signature")]
    InvalidSignature,
}

impl PresignError {
    /// Whether the caller may fall back to backend-native presign.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoTokenManager | Self::NoPersistenceClient | Self::MissingBaseUrl
        )
    }

    /// Create an encoding error.
    #[must_use]
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(PresignError::NoTokenManager, true)]
    #[case(PresignError::NoPersistenceClient, true)]
    #[case(PresignError::MissingBaseUrl, true)]
    #[case(PresignError::MissingFileId, false)]
    #[case(PresignError::MissingObjectUri, false)]
    #[case(PresignError::InvalidSecretLength { expected: 128, actual: 3 }, false)]
    #[case(PresignError::Timeout(Duration::from_secs(5)), false)]
    fn test_is_recoverable(#[case] err: PresignError, #[case] expected: bool) {
        assert_eq!(err.is_recoverable(), expected);
    }
}
