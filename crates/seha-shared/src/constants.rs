/// Application name
pub const APP_NAME: &str = "Seha";

/// XChaCha20-Poly1305 nonce size in bytes
pub const NONCE_SIZE: usize = 24;

/// Symmetric key size in bytes (for XChaCha20-Poly1305)
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// Maximum encrypted backup size accepted by the server (10 MiB)
pub const MAX_BACKUP_SIZE: usize = 10 * 1024 * 1024;

/// Local key-value entry holding the device's backup key (hex-encoded)
pub const LOCAL_KEY_BACKUP_KEY: &str = "device_backup_key";

/// Local key-value entry holding the last successful sync timestamp (RFC 3339)
pub const LOCAL_KEY_LAST_SYNCED: &str = "backup_last_synced_at";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;
