//! Backup and restore orchestration.
//!
//! Two linear operations: `backup_now` (snapshot → encrypt → upsert → stamp
//! last-synced) and `restore` (fetch → decrypt → wholesale import → stamp
//! last-synced).  Any step's failure short-circuits the rest and no local
//! state is mutated on failure.  Both operations are invoked only on
//! explicit user action; there is no scheduling and no retry here.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use seha_shared::constants::LOCAL_KEY_LAST_SYNCED;
use seha_store::{Database, SnapshotPayload};

use crate::codec::SnapshotCodec;
use crate::error::{BackupError, Result};
use crate::keystore::{KeyStore, KeyValue};
use crate::remote::RemoteStore;

/// The local Storage collaborator: a complete point-in-time snapshot out, a
/// wholesale replacement in.
pub trait SnapshotStore {
    fn export_snapshot(&self) -> Result<SnapshotPayload>;

    /// Replace every local entity collection with the payload's contents.
    /// Destructive and all-or-nothing; never a merge.
    fn import_snapshot(&self, payload: &SnapshotPayload) -> Result<()>;
}

impl SnapshotStore for Arc<Mutex<Database>> {
    fn export_snapshot(&self) -> Result<SnapshotPayload> {
        let db = self
            .lock()
            .map_err(|e| BackupError::Store(format!("Lock poisoned: {e}")))?;
        db.export_snapshot().map_err(|e| BackupError::Store(e.to_string()))
    }

    fn import_snapshot(&self, payload: &SnapshotPayload) -> Result<()> {
        let db = self
            .lock()
            .map_err(|e| BackupError::Store(format!("Lock poisoned: {e}")))?;
        db.import_snapshot(payload)
            .map_err(|e| BackupError::Store(e.to_string()))
    }
}

/// Locally cached sync bookkeeping, stored under a fixed key.
#[derive(Clone)]
pub struct SyncMetadata {
    kv: Arc<dyn KeyValue>,
}

impl SyncMetadata {
    pub fn new(kv: Arc<dyn KeyValue>) -> Self {
        Self { kv }
    }

    /// Timestamp of the last confirmed sync.  Advisory: a malformed stored
    /// value reads as "never synced".
    pub fn last_synced_at(&self) -> Result<Option<DateTime<Utc>>> {
        let Some(stored) = self.kv.get(LOCAL_KEY_LAST_SYNCED)? else {
            return Ok(None);
        };
        Ok(DateTime::parse_from_rfc3339(&stored)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)))
    }

    pub fn set_last_synced(&self, when: DateTime<Utc>) -> Result<()> {
        self.kv.put(LOCAL_KEY_LAST_SYNCED, &when.to_rfc3339())
    }
}

/// Read-only view for the backup settings screen.  Not used to gate the
/// correctness of backup or restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupStatus {
    pub remote_exists: bool,
    pub remote_updated_at: Option<DateTime<Utc>>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Orchestrates backup and restore against the injected collaborators.
pub struct BackupCoordinator<R, S>
where
    R: RemoteStore,
    S: SnapshotStore,
{
    remote: R,
    store: S,
    codec: SnapshotCodec,
    meta: SyncMetadata,
    // Serializes backup_now/restore: a restore must not import into a store
    // that a concurrent backup is mid-read on, and vice versa.  Concurrent
    // callers queue.
    in_flight: tokio::sync::Mutex<()>,
}

impl<R, S> BackupCoordinator<R, S>
where
    R: RemoteStore,
    S: SnapshotStore,
{
    pub fn new(remote: R, store: S, keys: KeyStore, meta: SyncMetadata) -> Self {
        Self {
            remote,
            store,
            codec: SnapshotCodec::new(keys),
            meta,
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    /// Snapshot all local data, encrypt it with the device key and upsert it
    /// as the user's single remote record.  `last_synced_at` is stamped only
    /// after the remote write is confirmed.
    pub async fn backup_now(&self, user_id: Uuid) -> Result<()> {
        let _guard = self.in_flight.lock().await;

        let snapshot = self.store.export_snapshot()?;
        let blob = self.codec.encrypt(&snapshot)?;
        self.remote.upsert(user_id, &blob).await?;
        self.meta.set_last_synced(Utc::now())?;

        info!(
            user = %user_id,
            size_bytes = blob.len(),
            health_logs = snapshot.health_logs.len(),
            medications = snapshot.medications.len(),
            "backup uploaded"
        );

        Ok(())
    }

    /// Fetch the user's remote record, decrypt it and replace all local data
    /// with its contents.  Fails with [`BackupError::NoBackupFound`] when no
    /// record exists; no local mutation happens on any failure.
    pub async fn restore(&self, user_id: Uuid) -> Result<()> {
        let _guard = self.in_flight.lock().await;

        let blob = self
            .remote
            .fetch(user_id)
            .await?
            .ok_or(BackupError::NoBackupFound)?;
        let snapshot = self.codec.decrypt(&blob)?;
        self.store.import_snapshot(&snapshot)?;
        self.meta.set_last_synced(Utc::now())?;

        info!(
            user = %user_id,
            health_logs = snapshot.health_logs.len(),
            medications = snapshot.medications.len(),
            exported = %snapshot.export_date,
            "backup restored"
        );

        Ok(())
    }

    /// Combine the remote record's status with the locally cached
    /// last-synced timestamp.  Best-effort; never fails.
    pub async fn status(&self, user_id: Uuid) -> BackupStatus {
        let remote = self.remote.status(user_id).await;
        let last_synced_at = self.meta.last_synced_at().unwrap_or(None);

        BackupStatus {
            remote_exists: remote.exists,
            remote_updated_at: remote.updated_at,
            last_synced_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testutil::{seed_database, FailingRemote, MemoryKv, MemoryRemote};

    fn open_database(dir: &tempfile::TempDir) -> Arc<Mutex<Database>> {
        Arc::new(Mutex::new(
            Database::open_at(&dir.path().join("seha.db")).unwrap(),
        ))
    }

    fn coordinator_for(
        remote: Arc<MemoryRemote>,
        db: Arc<Mutex<Database>>,
    ) -> BackupCoordinator<Arc<MemoryRemote>, Arc<Mutex<Database>>> {
        let kv: Arc<dyn KeyValue> = db.clone();
        BackupCoordinator::new(
            remote,
            db,
            KeyStore::new(kv.clone()),
            SyncMetadata::new(kv),
        )
    }

    #[tokio::test]
    async fn test_backup_wipe_restore_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_database(&dir);
        let seeded = seed_database(&db.lock().unwrap(), 3, 2);

        let remote = Arc::new(MemoryRemote::default());
        let coordinator = coordinator_for(remote.clone(), db.clone());
        let user = Uuid::new_v4();

        coordinator.backup_now(user).await.unwrap();
        assert_eq!(remote.record_count().await, 1);

        db.lock().unwrap().clear_all().unwrap();
        assert!(db.lock().unwrap().export_snapshot().unwrap().health_logs.is_empty());

        coordinator.restore(user).await.unwrap();

        let restored = db.lock().unwrap().export_snapshot().unwrap();
        assert_eq!(restored.health_logs, seeded.health_logs);
        assert_eq!(restored.medications, seeded.medications);
    }

    #[tokio::test]
    async fn test_backup_twice_keeps_one_record_and_advances_updated_at() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_database(&dir);
        seed_database(&db.lock().unwrap(), 1, 1);

        let remote = Arc::new(MemoryRemote::default());
        let coordinator = coordinator_for(remote.clone(), db);
        let user = Uuid::new_v4();

        coordinator.backup_now(user).await.unwrap();
        let first = remote.updated_at(user).await.unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;

        coordinator.backup_now(user).await.unwrap();
        let second = remote.updated_at(user).await.unwrap();

        assert_eq!(remote.record_count().await, 1);
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_restore_without_record_fails_and_mutates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_database(&dir);
        let seeded = seed_database(&db.lock().unwrap(), 2, 1);

        let coordinator = coordinator_for(Arc::new(MemoryRemote::default()), db.clone());

        let result = coordinator.restore(Uuid::new_v4()).await;
        assert!(matches!(result, Err(BackupError::NoBackupFound)));

        // Local data untouched
        let after = db.lock().unwrap().export_snapshot().unwrap();
        assert_eq!(after.health_logs, seeded.health_logs);
        assert!(coordinator.meta.last_synced_at().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_restore_on_other_device_never_yields_garbage() {
        let remote = Arc::new(MemoryRemote::default());
        let user = Uuid::new_v4();

        // Device A backs up
        let dir_a = tempfile::tempdir().unwrap();
        let db_a = open_database(&dir_a);
        seed_database(&db_a.lock().unwrap(), 3, 2);
        let device_a = coordinator_for(remote.clone(), db_a);
        device_a.backup_now(user).await.unwrap();

        // Device B has no key at all
        let dir_b = tempfile::tempdir().unwrap();
        let db_b = open_database(&dir_b);
        let device_b = coordinator_for(remote.clone(), db_b.clone());
        assert!(matches!(
            device_b.restore(user).await,
            Err(BackupError::KeyNotFound)
        ));

        // Device B with its own key still cannot decrypt A's backup
        let kv_b: Arc<dyn KeyValue> = db_b.clone();
        KeyStore::new(kv_b).get_or_create().unwrap();
        assert!(matches!(
            device_b.restore(user).await,
            Err(BackupError::DecryptionFailed)
        ));

        // And nothing was imported either way
        assert!(db_b.lock().unwrap().export_snapshot().unwrap().health_logs.is_empty());
    }

    #[tokio::test]
    async fn test_remote_failure_leaves_last_synced_unset() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_database(&dir);
        seed_database(&db.lock().unwrap(), 1, 0);

        let kv: Arc<dyn KeyValue> = db.clone();
        let coordinator = BackupCoordinator::new(
            FailingRemote,
            db,
            KeyStore::new(kv.clone()),
            SyncMetadata::new(kv),
        );

        let result = coordinator.backup_now(Uuid::new_v4()).await;
        assert!(matches!(result, Err(BackupError::Remote(_))));
        assert!(coordinator.meta.last_synced_at().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_last_synced_stamped_after_success() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_database(&dir);
        seed_database(&db.lock().unwrap(), 1, 1);

        let remote = Arc::new(MemoryRemote::default());
        let coordinator = coordinator_for(remote.clone(), db);
        let user = Uuid::new_v4();

        assert!(coordinator.meta.last_synced_at().unwrap().is_none());
        coordinator.backup_now(user).await.unwrap();
        assert!(coordinator.meta.last_synced_at().unwrap().is_some());

        let status = coordinator.status(user).await;
        assert!(status.remote_exists);
        assert!(status.remote_updated_at.is_some());
        assert!(status.last_synced_at.is_some());
    }

    #[tokio::test]
    async fn test_status_degrades_on_remote_failure() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_database(&dir);

        let kv: Arc<dyn KeyValue> = db.clone();
        let coordinator = BackupCoordinator::new(
            FailingRemote,
            db,
            KeyStore::new(kv.clone()),
            SyncMetadata::new(kv),
        );

        let status = coordinator.status(Uuid::new_v4()).await;
        assert!(!status.remote_exists);
        assert!(status.remote_updated_at.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_backups_serialize() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_database(&dir);
        seed_database(&db.lock().unwrap(), 2, 2);

        let remote = Arc::new(MemoryRemote::default());
        let coordinator = coordinator_for(remote.clone(), db);
        let user = Uuid::new_v4();

        // Double-tap: both queue on the in-flight lock, both succeed, the
        // remote still holds exactly one record.
        let (a, b) = tokio::join!(coordinator.backup_now(user), coordinator.backup_now(user));
        a.unwrap();
        b.unwrap();
        assert_eq!(remote.record_count().await, 1);
    }

    #[tokio::test]
    async fn test_sync_metadata_ignores_malformed_timestamp() {
        let kv: Arc<dyn KeyValue> = Arc::new(MemoryKv::default());
        kv.put(LOCAL_KEY_LAST_SYNCED, "not-a-timestamp").unwrap();

        let meta = SyncMetadata::new(kv);
        assert!(meta.last_synced_at().unwrap().is_none());
    }
}
