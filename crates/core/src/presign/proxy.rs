//! Application-signed download URLs.
//!
//! Issuing a URL generates a fresh secret, signs a payload bound to the file
//! and caller, stores the secret through the persistence client, and composes
//! `{base}/{file_id}/download?token={token}`. Redemption reverses the steps.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use stowage_shared::AuthenticatedCaller;

use super::error::PresignError;
use super::secret::DownloadSecret;
use super::token::{DownloadTokenPayload, TokenClaims, TokenIssuer};
use super::url::download_url;
use crate::persistence::{DownloadSecretRecord, PersistenceError, PersistenceSlot};
use crate::storage::{ProxyPresignConfig, StoredFile};

/// Token lifetime used when the caller asks for zero.
pub const DEFAULT_PRESIGN_DURATION: Duration = Duration::from_secs(15 * 60);

/// Upper bound for one persistence round-trip.
pub const DEFAULT_PERSISTENCE_TIMEOUT: Duration = Duration::from_secs(5);

/// Issues and redeems proxy download tokens.
#[derive(Debug, Clone)]
pub struct ProxyPresigner {
    persistence: Arc<PersistenceSlot>,
    timeout: Duration,
    default_duration: Duration,
}

impl ProxyPresigner {
    /// Presigner storing secrets through the given slot.
    #[must_use]
    pub fn new(persistence: Arc<PersistenceSlot>) -> Self {
        Self {
            persistence,
            timeout: DEFAULT_PERSISTENCE_TIMEOUT,
            default_duration: DEFAULT_PRESIGN_DURATION,
        }
    }

    /// Set the persistence timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the lifetime used when a request asks for zero.
    #[must_use]
    pub fn with_default_duration(mut self, duration: Duration) -> Self {
        self.default_duration = duration;
        self
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, PresignError>
    where
        F: Future<Output = Result<T, PersistenceError>>,
    {
        tokio::time::timeout(self.timeout, op)
            .await
            .map_err(|_| PresignError::Timeout(self.timeout))?
            .map_err(PresignError::from)
    }

    /// Issue a download URL with a freshly generated secret.
    pub async fn generate_download_url(
        &self,
        file: &StoredFile,
        caller: Option<&AuthenticatedCaller>,
        config: Option<&ProxyPresignConfig>,
        expires_in: Duration,
    ) -> Result<String, PresignError> {
        let secret = DownloadSecret::generate().to_bytes();
        self.generate_with_secret(file, caller, config, expires_in, &secret)
            .await
    }

    /// Issue a download URL with caller-supplied secret bytes.
    ///
    /// `secret` must be exactly 128 bytes: nonce, then signing key.
    pub async fn generate_with_secret(
        &self,
        file: &StoredFile,
        caller: Option<&AuthenticatedCaller>,
        config: Option<&ProxyPresignConfig>,
        expires_in: Duration,
        secret: &[u8],
    ) -> Result<String, PresignError> {
        let file_id = file.id.trim();
        if file_id.is_empty() {
            return Err(PresignError::MissingFileId);
        }
        let object_uri = file.object_uri().ok_or(PresignError::MissingObjectUri)?;
        let secret = DownloadSecret::from_bytes(secret)?;

        let config = config.ok_or(PresignError::NoTokenManager)?;
        let issuer = config
            .token_issuer
            .as_deref()
            .ok_or(PresignError::NoTokenManager)?;
        let persistence = self
            .persistence
            .get()
            .ok_or(PresignError::NoPersistenceClient)?;
        if config.base_url.trim().is_empty() {
            return Err(PresignError::MissingBaseUrl);
        }

        let lifetime = if expires_in.is_zero() {
            self.default_duration
        } else {
            expires_in
        };
        let expires_at = chrono::Duration::from_std(lifetime)
            .ok()
            .and_then(|delta| Utc::now().checked_add_signed(delta))
            .ok_or(PresignError::InvalidDuration)?;

        let subject_id = caller.map(|c| c.subject_id.clone()).filter(|s| !s.is_empty());
        let organization_id = caller.and_then(AuthenticatedCaller::organization).map(str::to_string);
        let issued = issuer.issue(
            TokenClaims {
                object_uri,
                expires_at,
                subject_id: subject_id.clone(),
                organization_id: organization_id.clone(),
                content_type: Some(file.content_type.clone()).filter(|s| !s.is_empty()),
                file_name: Some(file.original_name.clone()).filter(|s| !s.is_empty()),
            },
            &secret,
        )?;

        let record = DownloadSecretRecord {
            token_id: issued.payload.token_id,
            file_id: file_id.to_string(),
            subject_id,
            organization_id,
            secret: secret.to_bytes(),
            token: issued.token.clone(),
            payload: issued.payload_bytes,
            expires_at,
        };
        self.bounded(persistence.store_download_secret(record)).await?;

        tracing::debug!(
            file_id,
            token_id = %issued.payload.token_id,
            %expires_at,
            "issued proxy download token"
        );
        Ok(download_url(&config.base_url, file_id, &issued.token))
    }

    /// Redeem a token for a file.
    ///
    /// Returns the signed payload if the token is genuine, unexpired, and
    /// either unbound or bound to `caller`.
    pub async fn verify(
        &self,
        file_id: &str,
        token: &str,
        caller: Option<&AuthenticatedCaller>,
        issuer: &TokenIssuer,
    ) -> Result<DownloadTokenPayload, PresignError> {
        let persistence = self
            .persistence
            .get()
            .ok_or(PresignError::NoPersistenceClient)?;
        let record = self
            .bounded(persistence.find_download_secret(file_id, token))
            .await?
            .ok_or(PresignError::TokenNotFound)?;

        if record.token != token || record.file_id != file_id {
            return Err(PresignError::TokenMismatch);
        }
        if record.secret.is_empty() {
            return Err(PresignError::EmptySecret);
        }
        let secret = DownloadSecret::from_bytes(&record.secret)?;
        if record.expires_at <= Utc::now() {
            return Err(PresignError::Expired);
        }
        if let Some(subject) = record.subject_id.as_deref() {
            if caller.map(|c| c.subject_id.as_str()) != Some(subject) {
                return Err(PresignError::Unauthorized);
            }
        }
        if let Some(org) = record.organization_id.as_deref() {
            if caller.and_then(AuthenticatedCaller::organization) != Some(org) {
                return Err(PresignError::Unauthorized);
            }
        }

        issuer.verify(token, &record.payload, &secret)
    }
}
