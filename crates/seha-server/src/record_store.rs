//! On-disk storage of backup records, one file per user.
//!
//! A record is `records/<user_uuid>.json` holding the opaque ciphertext and
//! its last-modified timestamp.  Uuid keying means file names can never
//! contain traversal characters.  Upserts are whole-file overwrites, so the
//! semantics are last-write-wins with at most one record per user.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ServerError;

/// The stored record for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRecord {
    pub encrypted_blob: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct BackupRecordStore {
    base_path: PathBuf,
    max_size: usize,
}

impl BackupRecordStore {
    pub async fn new(base_path: PathBuf, max_size: usize) -> Result<Self, ServerError> {
        fs::create_dir_all(&base_path).await.map_err(|e| {
            ServerError::BackupStorage(format!(
                "Failed to create records directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), "Backup record store initialized");

        Ok(Self { base_path, max_size })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Write or overwrite the one record for `user_id`, stamping
    /// `updated_at` with the current time.
    pub async fn upsert(&self, user_id: Uuid, encrypted_blob: &str) -> Result<BackupRecord, ServerError> {
        if encrypted_blob.is_empty() {
            return Err(ServerError::BadRequest("Empty backup blob".to_string()));
        }
        if encrypted_blob.len() > self.max_size {
            return Err(ServerError::BackupTooLarge {
                size: encrypted_blob.len(),
                max: self.max_size,
            });
        }

        let record = BackupRecord {
            encrypted_blob: encrypted_blob.to_string(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_vec(&record)
            .map_err(|e| ServerError::Internal(format!("Failed to serialize record: {e}")))?;

        fs::write(self.record_path(user_id), json).await.map_err(|e| {
            ServerError::BackupStorage(format!("Failed to write record for {user_id}: {e}"))
        })?;

        debug!(user = %user_id, size = encrypted_blob.len(), "Stored backup record");
        Ok(record)
    }

    /// Return the record for `user_id`, or `None` if the user has never
    /// backed up.
    pub async fn get(&self, user_id: Uuid) -> Result<Option<BackupRecord>, ServerError> {
        let path = self.record_path(user_id);

        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read(&path).await.map_err(|e| {
            ServerError::BackupStorage(format!("Failed to read record for {user_id}: {e}"))
        })?;

        let record: BackupRecord = serde_json::from_slice(&json).map_err(|e| {
            ServerError::BackupStorage(format!("Corrupt record for {user_id}: {e}"))
        })?;

        debug!(user = %user_id, "Retrieved backup record");
        Ok(Some(record))
    }

    pub async fn delete(&self, user_id: Uuid) -> Result<(), ServerError> {
        let path = self.record_path(user_id);

        if !path.exists() {
            return Err(ServerError::BackupNotFound(user_id));
        }

        fs::remove_file(&path).await.map_err(|e| {
            ServerError::BackupStorage(format!("Failed to delete record for {user_id}: {e}"))
        })?;

        debug!(user = %user_id, "Deleted backup record");
        Ok(())
    }

    fn record_path(&self, user_id: Uuid) -> PathBuf {
        self.base_path.join(format!("{user_id}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_store() -> (BackupRecordStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = BackupRecordStore::new(dir.path().to_path_buf(), 1024 * 1024)
            .await
            .unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let (store, _dir) = test_store().await;
        let user = Uuid::new_v4();

        store.upsert(user, "ciphertext-v1").await.unwrap();
        let record = store.get(user).await.unwrap().unwrap();
        assert_eq!(record.encrypted_blob, "ciphertext-v1");
    }

    #[tokio::test]
    async fn test_upsert_overwrites() {
        let (store, _dir) = test_store().await;
        let user = Uuid::new_v4();

        let first = store.upsert(user, "ciphertext-v1").await.unwrap();
        let second = store.upsert(user, "ciphertext-v2").await.unwrap();

        let record = store.get(user).await.unwrap().unwrap();
        assert_eq!(record.encrypted_blob, "ciphertext-v2");
        assert!(second.updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn test_get_absent_is_none() {
        let (store, _dir) = test_store().await;
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let (store, _dir) = test_store().await;
        let user = Uuid::new_v4();

        store.upsert(user, "delete-me").await.unwrap();
        store.delete(user).await.unwrap();
        assert!(store.get(user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_absent_fails() {
        let (store, _dir) = test_store().await;
        assert!(store.delete(Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_blob_rejected() {
        let (store, _dir) = test_store().await;
        assert!(store.upsert(Uuid::new_v4(), "").await.is_err());
    }

    #[tokio::test]
    async fn test_oversized_blob_rejected() {
        let dir = TempDir::new().unwrap();
        let store = BackupRecordStore::new(dir.path().to_path_buf(), 8).await.unwrap();
        assert!(matches!(
            store.upsert(Uuid::new_v4(), "way-past-eight-bytes").await,
            Err(ServerError::BackupTooLarge { .. })
        ));
    }
}
