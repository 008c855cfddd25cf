//! # seha-store
//!
//! Local persistence for the Seha application.
//!
//! Entity collections (health logs, medications, appointments, ...) are each
//! stored as one JSON document in a `collections` table, mirroring the
//! key-value persistence the mobile app uses.  A second `local_kv` table
//! holds the handful of fixed keys the backup subsystem needs (the device
//! backup key and the last-synced timestamp).  The crate exposes a
//! synchronous [`Database`] handle that wraps a `rusqlite::Connection`.

pub mod database;
pub mod models;
pub mod snapshot;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
pub use snapshot::SnapshotPayload;
