//! Download token payload and HMAC-SHA256 signing.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use super::error::PresignError;
use super::secret::DownloadSecret;

type HmacSha256 = Hmac<Sha256>;

/// Signed content of a download token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadTokenPayload {
    /// Token identifier.
    pub token_id: Uuid,
    /// Object the token grants access to.
    pub object_uri: String,
    /// Expiry.
    pub expires_at: DateTime<Utc>,
    /// Subject the token is bound to.
    pub subject_id: Option<String>,
    /// Organization the token is bound to.
    pub organization_id: Option<String>,
    /// Nonce half of the secret.
    pub nonce: Vec<u8>,
    /// Issuing authority.
    pub issuer: String,
    /// Intended audience.
    pub audience: String,
    /// MIME type of the file.
    pub content_type: Option<String>,
    /// Original file name.
    pub file_name: Option<String>,
}

impl DownloadTokenPayload {
    /// Compact binary encoding.
    pub fn encode(&self) -> Result<Vec<u8>, PresignError> {
        bincode::serialize(self).map_err(|e| PresignError::encoding(e.to_string()))
    }

    /// Decode a payload produced by [`Self::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, PresignError> {
        bincode::deserialize(bytes).map_err(|e| PresignError::encoding(e.to_string()))
    }
}

/// Claims supplied by the caller when issuing a token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenClaims {
    /// Object the token grants access to.
    pub object_uri: String,
    /// Expiry.
    pub expires_at: DateTime<Utc>,
    /// Subject to bind the token to.
    pub subject_id: Option<String>,
    /// Organization to bind the token to.
    pub organization_id: Option<String>,
    /// MIME type of the file.
    pub content_type: Option<String>,
    /// Original file name.
    pub file_name: Option<String>,
}

/// A signed token with the exact bytes it signs.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Token string (base64url, unpadded MAC).
    pub token: String,
    /// Decoded payload.
    pub payload: DownloadTokenPayload,
    /// Encoded payload the MAC covers.
    pub payload_bytes: Vec<u8>,
}

/// Token-issuing authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIssuer {
    issuer: String,
    audience: String,
}

impl TokenIssuer {
    /// Creates an issuer.
    #[must_use]
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    /// Issuer name.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Audience.
    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Build, encode and sign a payload with the secret's key.
    pub fn issue(
        &self,
        claims: TokenClaims,
        secret: &DownloadSecret,
    ) -> Result<IssuedToken, PresignError> {
        let payload = DownloadTokenPayload {
            token_id: Uuid::new_v4(),
            object_uri: claims.object_uri,
            expires_at: claims.expires_at,
            subject_id: claims.subject_id,
            organization_id: claims.organization_id,
            nonce: secret.nonce().to_vec(),
            issuer: self.issuer.clone(),
            audience: self.audience.clone(),
            content_type: claims.content_type,
            file_name: claims.file_name,
        };
        let payload_bytes = payload.encode()?;
        let token = sign(secret.key(), &payload_bytes)?;
        Ok(IssuedToken {
            token,
            payload,
            payload_bytes,
        })
    }

    /// Check a token against the payload bytes and secret it was issued with.
    ///
    /// Fails if the MAC differs, or if the payload was issued by another
    /// authority or with another nonce.
    pub fn verify(
        &self,
        token: &str,
        payload_bytes: &[u8],
        secret: &DownloadSecret,
    ) -> Result<DownloadTokenPayload, PresignError> {
        verify_signature(secret.key(), payload_bytes, token)?;
        let payload = DownloadTokenPayload::decode(payload_bytes)?;
        if payload.issuer != self.issuer
            || payload.audience != self.audience
            || payload.nonce.as_slice() != secret.nonce().as_slice()
        {
            return Err(PresignError::InvalidSignature);
        }
        Ok(payload)
    }
}

fn mac(key: &[u8], payload: &[u8]) -> Result<HmacSha256, PresignError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| PresignError::InvalidSecretLength {
        expected: super::secret::HALF_LEN,
        actual: key.len(),
    })?;
    mac.update(payload);
    Ok(mac)
}

/// HMAC-SHA256 of `payload`, base64url without padding.
pub fn sign(key: &[u8], payload: &[u8]) -> Result<String, PresignError> {
    Ok(URL_SAFE_NO_PAD.encode(mac(key, payload)?.finalize().into_bytes()))
}

/// Constant-time check of a token against `payload`.
pub fn verify_signature(key: &[u8], payload: &[u8], token: &str) -> Result<(), PresignError> {
    let tag = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|_| PresignError::InvalidSignature)?;
    mac(key, payload)?
        .verify_slice(&tag)
        .map_err(|_| PresignError::InvalidSignature)
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    // Flipping any bit of the signed payload invalidates the token.
    proptest! {
        #[test]
        fn prop_any_payload_change_breaks_mac(
            payload in proptest::collection::vec(any::<u8>(), 1..256),
            index in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let key = [7u8; 64];
            let token = sign(&key, &payload).unwrap();
            prop_assert!(verify_signature(&key, &payload, &token).is_ok());

            let mut tampered = payload.clone();
            let i = index.index(tampered.len());
            tampered[i] ^= 1 << bit;
            prop_assert!(verify_signature(&key, &tampered, &token).is_err());
        }
    }

    // Tokens are unpadded base64url.
    proptest! {
        #[test]
        fn prop_token_alphabet(payload in proptest::collection::vec(any::<u8>(), 0..128)) {
            let token = sign(&[1u8; 64], &payload).unwrap();
            prop_assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        }
    }
}
