use thiserror::Error;

/// Errors produced by the backup subsystem.
///
/// Every core operation returns one of these; callers get a single terminal
/// error describing the first failing step.  There is no automatic retry
/// anywhere in this crate.
#[derive(Error, Debug)]
pub enum BackupError {
    /// Decryption was attempted on a device with no backup key.  The key is
    /// never fabricated on the decrypt path: a missing key means this device
    /// did not produce the backup.
    #[error("No backup key exists on this device")]
    KeyNotFound,

    /// The ciphertext failed integrity or format checks — wrong key or a
    /// corrupted blob.
    #[error("Decryption failed: wrong key or corrupted backup")]
    DecryptionFailed,

    /// Decryption succeeded but the plaintext is not a valid snapshot.
    #[error("Decrypted backup is not a valid snapshot")]
    CorruptPayload,

    /// The persisted key material is malformed (bad hex or wrong length).
    /// Regenerating would orphan every existing backup, so this is surfaced
    /// instead.
    #[error("Stored backup key is invalid")]
    InvalidKeyMaterial,

    /// Network or remote-store failure during upsert or fetch.
    #[error("Remote error: {0}")]
    Remote(String),

    /// Restore was attempted but no remote record exists for the user.
    #[error("No backup found for this user")]
    NoBackupFound,

    /// Local storage / snapshot collaborator failure.
    #[error("Local storage error: {0}")]
    Store(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BackupError>;
