//! Shared configuration, errors, and caller types for Stowage.
//!
//! This crate provides common types used across all other crates:
//! - Layered application configuration (files + environment)
//! - Application-wide error types with stable codes
//! - The authenticated caller seen by the storage core

pub mod auth;
pub mod config;
pub mod error;

#[cfg(test)]
mod error_tests;

pub use auth::AuthenticatedCaller;
pub use config::{
    AppConfig, ProviderSettings, ProvidersSettings, ProxyPresignSettings, RouteSettings,
    StorageSettings,
};
pub use error::{AppError, AppResult};
