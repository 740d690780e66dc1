//! Provider client caching.
//!
//! - `pool` - TTL cache keyed by tenant, backend and config fingerprint
//! - `service` - build-on-miss lookup over the builder registry

mod pool;
mod service;

pub use pool::{CacheKey, ClientPool, Clock, DEFAULT_POOL_TTL, fingerprint};
pub use service::{ClientError, ClientService, SHARED_TENANT};
