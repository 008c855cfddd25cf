//! Snapshot (de)serialization and encryption.
//!
//! The envelope is `base64(nonce || ciphertext)`: everything the cipher
//! needs to decrypt travels inside the one opaque string that is stored
//! remotely.  A fresh random nonce is drawn per encryption, so encrypting
//! the same snapshot twice never reuses an IV/key pair.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use seha_shared::crypto;
use seha_store::SnapshotPayload;

use crate::error::{BackupError, Result};
use crate::keystore::KeyStore;

/// Encrypts and decrypts [`SnapshotPayload`] values with the device key.
#[derive(Clone)]
pub struct SnapshotCodec {
    keys: KeyStore,
}

impl SnapshotCodec {
    pub fn new(keys: KeyStore) -> Self {
        Self { keys }
    }

    /// Serialize and encrypt a snapshot into one opaque string.
    ///
    /// Creates the device key on first use.
    pub fn encrypt(&self, payload: &SnapshotPayload) -> Result<String> {
        let key = self.keys.get_or_create()?;
        let plaintext =
            serde_json::to_vec(payload).map_err(|e| BackupError::Store(e.to_string()))?;

        let ciphertext = crypto::encrypt(&key, &plaintext)
            .map_err(|_| BackupError::Store("encryption failed".into()))?;

        Ok(BASE64.encode(ciphertext))
    }

    /// Decrypt and deserialize an encrypted blob.
    ///
    /// Fails with [`BackupError::KeyNotFound`] when this device holds no
    /// key, [`BackupError::DecryptionFailed`] when the ciphertext fails
    /// integrity or format checks, and [`BackupError::CorruptPayload`] when
    /// the decrypted bytes are not a valid snapshot.
    pub fn decrypt(&self, blob: &str) -> Result<SnapshotPayload> {
        let key = self.keys.get_if_exists()?.ok_or(BackupError::KeyNotFound)?;

        let ciphertext = BASE64
            .decode(blob.trim())
            .map_err(|_| BackupError::DecryptionFailed)?;

        let plaintext =
            crypto::decrypt(&key, &ciphertext).map_err(|_| BackupError::DecryptionFailed)?;

        serde_json::from_slice(&plaintext).map_err(|_| BackupError::CorruptPayload)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::keystore::KeyValue;
    use crate::testutil::{sample_snapshot, MemoryKv};

    fn codec_with_kv(kv: Arc<MemoryKv>) -> SnapshotCodec {
        SnapshotCodec::new(KeyStore::new(kv))
    }

    #[test]
    fn test_round_trip() {
        let codec = codec_with_kv(Arc::new(MemoryKv::default()));
        let payload = sample_snapshot(3, 2);

        let blob = codec.encrypt(&payload).unwrap();
        let decoded = codec.decrypt(&blob).unwrap();

        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_decrypt_without_key_is_key_not_found() {
        let kv = Arc::new(MemoryKv::default());
        let blob = codec_with_kv(kv).encrypt(&sample_snapshot(1, 1)).unwrap();

        // A different device that never created a key
        let other = codec_with_kv(Arc::new(MemoryKv::default()));
        assert!(matches!(other.decrypt(&blob), Err(BackupError::KeyNotFound)));
    }

    #[test]
    fn test_decrypt_with_different_key_fails() {
        let blob = codec_with_kv(Arc::new(MemoryKv::default()))
            .encrypt(&sample_snapshot(2, 1))
            .unwrap();

        // A different device with its own key
        let other = codec_with_kv(Arc::new(MemoryKv::default()));
        other.encrypt(&sample_snapshot(0, 0)).unwrap(); // forces key creation
        assert!(matches!(
            other.decrypt(&blob),
            Err(BackupError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_tampered_blob_fails_closed() {
        let kv = Arc::new(MemoryKv::default());
        let codec = codec_with_kv(kv);
        let blob = codec.encrypt(&sample_snapshot(2, 2)).unwrap();

        // Flip one byte inside the ciphertext (base64 decode, flip, re-encode)
        let mut raw = BASE64.decode(blob.as_bytes()).unwrap();
        let mid = raw.len() / 2;
        raw[mid] ^= 0x01;
        let tampered = BASE64.encode(raw);

        assert!(matches!(
            codec.decrypt(&tampered),
            Err(BackupError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_garbage_blob_fails() {
        let kv = Arc::new(MemoryKv::default());
        let codec = codec_with_kv(kv);
        codec.encrypt(&sample_snapshot(1, 0)).unwrap();

        assert!(matches!(
            codec.decrypt("@@not-base64@@"),
            Err(BackupError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_valid_ciphertext_invalid_payload_is_corrupt() {
        let kv = Arc::new(MemoryKv::default());
        let codec = codec_with_kv(kv.clone());
        codec.encrypt(&sample_snapshot(1, 1)).unwrap();

        // Encrypt bytes that are not a snapshot, with the same device key
        let key = KeyStore::new(kv).get_if_exists().unwrap().unwrap();
        let ciphertext = seha_shared::crypto::encrypt(&key, b"{\"not\":\"a snapshot\"}").unwrap();
        let blob = BASE64.encode(ciphertext);

        assert!(matches!(
            codec.decrypt(&blob),
            Err(BackupError::CorruptPayload)
        ));
    }

    #[test]
    fn test_encrypt_creates_key_lazily() {
        let kv = Arc::new(MemoryKv::default());
        let codec = codec_with_kv(kv.clone());

        assert!(kv.get("device_backup_key").unwrap().is_none());
        codec.encrypt(&sample_snapshot(0, 0)).unwrap();
        assert!(kv.get("device_backup_key").unwrap().is_some());
    }
}
