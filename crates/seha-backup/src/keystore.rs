//! Device-local backup key management.
//!
//! The key is generated once per device, persisted under a fixed key in the
//! local key-value store, and never leaves the device.  Losing local storage
//! loses the key, which makes every existing remote backup from this device
//! permanently undecryptable — an acknowledged failure mode, never papered
//! over by regenerating.

use std::sync::Arc;

use seha_shared::constants::LOCAL_KEY_BACKUP_KEY;
use seha_shared::crypto::{generate_symmetric_key, key_from_hex, SymmetricKey};

use crate::error::{BackupError, Result};

/// Minimal string key-value persistence the backup subsystem needs.
/// Implemented by [`seha_store::Database`] and by in-memory test doubles.
pub trait KeyValue: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&self, key: &str, value: &str) -> Result<()>;
    /// Write only if the key is absent; the first writer wins.
    fn put_if_absent(&self, key: &str, value: &str) -> Result<()>;
}

// `rusqlite::Connection` is not `Sync`, so the app shares the database as
// `Arc<Mutex<Database>>`; the trait is implemented on the lock.
impl KeyValue for std::sync::Mutex<seha_store::Database> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let db = self
            .lock()
            .map_err(|e| BackupError::Store(format!("Lock poisoned: {e}")))?;
        db.kv_get(key).map_err(|e| BackupError::Store(e.to_string()))
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let db = self
            .lock()
            .map_err(|e| BackupError::Store(format!("Lock poisoned: {e}")))?;
        db.kv_put(key, value).map_err(|e| BackupError::Store(e.to_string()))
    }

    fn put_if_absent(&self, key: &str, value: &str) -> Result<()> {
        let db = self
            .lock()
            .map_err(|e| BackupError::Store(format!("Lock poisoned: {e}")))?;
        db.kv_put_if_absent(key, value)
            .map_err(|e| BackupError::Store(e.to_string()))
    }
}

/// Owns the lifecycle of the device's symmetric backup key.
#[derive(Clone)]
pub struct KeyStore {
    kv: Arc<dyn KeyValue>,
}

impl KeyStore {
    pub fn new(kv: Arc<dyn KeyValue>) -> Self {
        Self { kv }
    }

    /// Return the device key, generating and persisting one on first use.
    ///
    /// Idempotent: the write is insert-if-absent and the stored value is
    /// re-read afterwards, so concurrent callers converge on one key.
    pub fn get_or_create(&self) -> Result<SymmetricKey> {
        if let Some(key) = self.get_if_exists()? {
            return Ok(key);
        }

        let key = generate_symmetric_key();
        self.kv.put_if_absent(LOCAL_KEY_BACKUP_KEY, &hex::encode(key))?;

        tracing::info!("generated device backup key");

        // Re-read: another caller may have won the write.
        self.get_if_exists()?.ok_or(BackupError::KeyNotFound)
    }

    /// Return the device key if one exists.  Never creates a key — the
    /// decrypt path needs the *original* key, and fabricating one here would
    /// mask a real device-mismatch error.
    pub fn get_if_exists(&self) -> Result<Option<SymmetricKey>> {
        match self.kv.get(LOCAL_KEY_BACKUP_KEY)? {
            None => Ok(None),
            Some(stored) => key_from_hex(&stored)
                .map(Some)
                .map_err(|_| BackupError::InvalidKeyMaterial),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MemoryKv;

    #[test]
    fn test_key_is_stable_across_calls() {
        let kv = Arc::new(MemoryKv::default());
        let keys = KeyStore::new(kv);

        let first = keys.get_or_create().unwrap();
        let second = keys.get_or_create().unwrap();
        let third = keys.get_if_exists().unwrap().unwrap();

        assert_eq!(first, second);
        assert_eq!(first, third);
    }

    #[test]
    fn test_get_if_exists_never_creates() {
        let kv = Arc::new(MemoryKv::default());
        let keys = KeyStore::new(kv.clone());

        assert!(keys.get_if_exists().unwrap().is_none());
        // Still absent after the read
        assert!(kv.get(LOCAL_KEY_BACKUP_KEY).unwrap().is_none());
    }

    #[test]
    fn test_first_writer_wins() {
        let kv = Arc::new(MemoryKv::default());
        kv.put_if_absent(LOCAL_KEY_BACKUP_KEY, &hex::encode([7u8; 32]))
            .unwrap();

        let keys = KeyStore::new(kv);
        let key = keys.get_or_create().unwrap();
        assert_eq!(key, [7u8; 32]);
    }

    #[test]
    fn test_malformed_stored_key_is_an_error() {
        let kv = Arc::new(MemoryKv::default());
        kv.put(LOCAL_KEY_BACKUP_KEY, "definitely-not-hex").unwrap();

        let keys = KeyStore::new(kv);
        assert!(matches!(
            keys.get_if_exists(),
            Err(BackupError::InvalidKeyMaterial)
        ));
    }
}
