//! Storage backends behind a single handle trait, using Apache OpenDAL.
//!
//! ```text
//! ┌──────────────┐  build(ctx, creds, options)  ┌──────────────────────┐
//! │ BuilderRegistry ├──────────────────────────▶│ Arc<dyn ProviderHandle> │
//! └──────────────┘                              └──────────────────────┘
//!        │ one builder per BackendKind                 │
//!        ▼                                             ▼
//!   S3 │ R2 │ Disk │ Database            OpenDAL operator / persistence client
//! ```

mod builder;
mod config;
mod error;
mod object_store;
mod provider;
pub mod providers;
mod types;

pub use builder::{BuilderRegistry, DuplicateBuilder, ProviderBuilder};
pub use config::{ProviderCredentials, ProviderOptions, ProxyPresignConfig};
pub use error::{BuildError, StorageError};
pub use provider::ProviderHandle;
#[cfg(test)]
pub(crate) use provider::MockProviderHandle;
pub use types::{
    BackendKind, DownloadedObject, ObjectMetadata, ProviderHints, StoredFile, UnknownBackend,
    UploadObject, UploadOptions,
};
