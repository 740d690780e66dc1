//! Download secret: a 64-byte nonce and a 64-byte signing key.

use rand::RngCore;

use super::error::PresignError;

/// Total secret length.
pub const SECRET_LEN: usize = 128;
/// Length of each half.
pub const HALF_LEN: usize = SECRET_LEN / 2;

/// Secret material for one download token.
///
/// The nonce travels in the token payload. The key never leaves the server.
#[derive(Clone, PartialEq, Eq)]
pub struct DownloadSecret {
    nonce: [u8; HALF_LEN],
    key: [u8; HALF_LEN],
}

impl DownloadSecret {
    /// Fresh random secret.
    #[must_use]
    pub fn generate() -> Self {
        let mut nonce = [0u8; HALF_LEN];
        let mut key = [0u8; HALF_LEN];
        let mut rng = rand::rng();
        rng.fill_bytes(&mut nonce);
        rng.fill_bytes(&mut key);
        Self { nonce, key }
    }

    /// Split 128 bytes into nonce (first half) and key (second half).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PresignError> {
        let invalid = || PresignError::InvalidSecretLength {
            expected: SECRET_LEN,
            actual: bytes.len(),
        };
        if bytes.len() != SECRET_LEN {
            return Err(invalid());
        }
        let (nonce, key) = bytes.split_at(HALF_LEN);
        Ok(Self {
            nonce: nonce.try_into().map_err(|_| invalid())?,
            key: key.try_into().map_err(|_| invalid())?,
        })
    }

    /// Embedded nonce.
    #[must_use]
    pub fn nonce(&self) -> &[u8; HALF_LEN] {
        &self.nonce
    }

    /// Signing key.
    #[must_use]
    pub fn key(&self) -> &[u8; HALF_LEN] {
        &self.key
    }

    /// Nonce followed by key.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SECRET_LEN);
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.key);
        bytes
    }
}

impl std::fmt::Debug for DownloadSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadSecret")
            .field("nonce", &"[hidden]")
            .field("key", &"[hidden]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_split() {
        let bytes: Vec<u8> = (0..=127).collect();
        let secret = DownloadSecret::from_bytes(&bytes).unwrap();
        assert_eq!(secret.nonce()[0], 0);
        assert_eq!(secret.nonce()[63], 63);
        assert_eq!(secret.key()[0], 64);
        assert_eq!(secret.key()[63], 127);
        assert_eq!(secret.to_bytes(), bytes);
    }

    #[rstest]
    #[case(0)]
    #[case(64)]
    #[case(127)]
    #[case(129)]
    fn test_invalid_length(#[case] len: usize) {
        let err = DownloadSecret::from_bytes(&vec![0; len]).unwrap_err();
        assert!(matches!(
            err,
            PresignError::InvalidSecretLength { expected: SECRET_LEN, actual } if actual == len
        ));
    }

    #[test]
    fn test_generate_is_random() {
        let a = DownloadSecret::generate();
        let b = DownloadSecret::generate();
        assert_ne!(a, b);
        assert_ne!(a.nonce(), a.key());
    }
}
