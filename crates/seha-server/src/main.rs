//! # seha-server
//!
//! Remote backup store for the Seha app.
//!
//! This binary provides:
//! - **Encrypted backup records**, at most one per user, stored as opaque
//!   ciphertext on disk (the server never holds a decryption key)
//! - **REST API** (axum) for upsert / fetch / status / delete keyed by
//!   user id
//! - **Per-IP rate limiting** to protect against abuse

mod api;
mod config;
mod error;
mod rate_limit;
mod record_store;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::rate_limit::RateLimiter;
use crate::record_store::BackupRecordStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,seha_server=debug")),
        )
        .init();

    info!("Starting Seha backup server v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // Record store (creates directory if missing)
    let record_store = Arc::new(
        BackupRecordStore::new(config.backup_storage_path.clone(), config.max_backup_size)
            .await?,
    );

    let state = AppState {
        record_store,
        rate_limiter: RateLimiter::default(),
        config: Arc::new(config.clone()),
    };

    // Periodic sweep keeps the per-IP bucket map bounded
    let limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(rate_limit::PURGE_INTERVAL);
        loop {
            interval.tick().await;
            limiter.purge_stale(rate_limit::PURGE_INTERVAL).await;
        }
    });

    api::serve(state, config.http_addr).await
}
