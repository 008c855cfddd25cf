//! # seha-backup
//!
//! The encrypted cloud-backup subsystem of Seha.
//!
//! Local health data is snapshotted by the store, serialized to JSON,
//! encrypted with a device-local symmetric key (XChaCha20-Poly1305) and
//! upserted as the user's single record in the remote backup store.  The
//! key never leaves the device; the server only ever sees ciphertext.
//!
//! - [`KeyStore`] — generates and persists the per-device key.
//! - [`SnapshotCodec`] — canonical serialization + authenticated encryption.
//! - [`RemoteStore`] / [`HttpRemoteClient`] — stateless blob transport.
//! - [`BackupCoordinator`] — orchestrates `backup_now` and `restore` and
//!   keeps the last-synced bookkeeping.

pub mod codec;
pub mod coordinator;
pub mod keystore;
pub mod remote;

mod error;

pub use codec::SnapshotCodec;
pub use coordinator::{BackupCoordinator, BackupStatus, SnapshotStore, SyncMetadata};
pub use error::{BackupError, Result};
pub use keystore::{KeyStore, KeyValue};
pub use remote::{HttpRemoteClient, RemoteStatus, RemoteStore};
