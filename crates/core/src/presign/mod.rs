//! Proxy presign: application-signed download URLs.
//!
//! Used for backends without native presign, or when a backend is configured
//! to route downloads through the application.

mod error;
mod proxy;
mod secret;
mod token;
mod url;

pub use error::PresignError;
pub use proxy::{DEFAULT_PERSISTENCE_TIMEOUT, DEFAULT_PRESIGN_DURATION, ProxyPresigner};
pub use secret::{DownloadSecret, HALF_LEN, SECRET_LEN};
pub use token::{DownloadTokenPayload, IssuedToken, TokenClaims, TokenIssuer, sign, verify_signature};
pub use url::download_url;
