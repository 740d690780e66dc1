//! Core storage routing logic for Stowage.
//!
//! Routes file operations to one of several interchangeable backends based on
//! request hints, caches live provider clients, and issues application-signed
//! download URLs for backends that cannot (or should not) presign natively.
//!
//! # Modules
//!
//! - `context` - Immutable per-request resolution hints
//! - `resolver` - Ordered rule chain picking a backend
//! - `client` - Client pool and client service
//! - `storage` - Backend kinds, builders, and provider handles
//! - `presign` - Proxy presign tokens: signing, secrets, URLs, redemption
//! - `persistence` - Persistence contract consumed from the host
//! - `service` - Orchestration service (composition root)

pub mod client;
pub mod context;
pub mod persistence;
pub mod presign;
pub mod resolver;
pub mod service;
pub mod storage;

pub use context::ResolutionContext;
pub use resolver::{ResolveError, ResolvedProvider, Resolver, Rule};
pub use service::{ServiceError, StorageService};
pub use storage::{BackendKind, ProviderCredentials, ProviderHandle, ProviderOptions, StoredFile};
