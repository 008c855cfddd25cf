//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use seha_shared::constants::{APP_NAME, DEFAULT_HTTP_PORT, MAX_BACKUP_SIZE};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Filesystem path where encrypted backup records are stored.
    /// Env: `BACKUP_STORAGE_PATH`
    /// Default: `./records`
    pub backup_storage_path: PathBuf,

    /// Maximum encrypted backup size in bytes.
    /// Env: `MAX_BACKUP_SIZE`
    /// Default: 10 MiB
    pub max_backup_size: usize,

    /// Human-readable name for this server instance.
    /// Env: `INSTANCE_NAME`
    /// Default: `"Seha Backup"`
    pub instance_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            backup_storage_path: PathBuf::from("./records"),
            max_backup_size: MAX_BACKUP_SIZE,
            instance_name: format!("{APP_NAME} Backup"),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let http_addr = std::env::var("HTTP_ADDR")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.http_addr);

        let backup_storage_path = std::env::var("BACKUP_STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.backup_storage_path);

        let max_backup_size = std::env::var("MAX_BACKUP_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_backup_size);

        let instance_name =
            std::env::var("INSTANCE_NAME").unwrap_or(defaults.instance_name);

        Self {
            http_addr,
            backup_storage_path,
            max_backup_size,
            instance_name,
        }
    }
}
