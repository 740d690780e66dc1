//! Stowage storage probe
//!
//! Loads configuration, wires the storage service and probes every enabled
//! backend once. Exits non-zero when a backend flagged `ensure_available` is
//! unreachable.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stowage_core::StorageService;
use stowage_core::persistence::MemoryPersistence;
use stowage_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stowage=debug,stowage_core=debug,stowage_probe=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;

    // The probe has no host database; secrets and database objects live in memory.
    let service = StorageService::from_config(&config, Some(Arc::new(MemoryPersistence::new())))
        .context("failed to configure storage service")?;

    let report = service.check_availability().await;
    for status in report.statuses() {
        if status.available {
            info!(provider = %status.kind, required = status.required, "available");
        } else {
            warn!(
                provider = %status.kind,
                required = status.required,
                error = status.error.as_deref().unwrap_or_default(),
                "unavailable"
            );
        }
    }
    println!("{}", serde_json::to_string_pretty(&report)?);

    service
        .ensure_available()
        .await
        .context("required storage backend is unreachable")?;
    info!(backends = report.statuses().len(), "storage probe passed");
    Ok(())
}
