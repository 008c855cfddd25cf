//! Transport of encrypted blobs to and from the remote backup store.
//!
//! The remote store holds at most one record per user: writes are upserts
//! keyed on user identity, last write wins, no merge and no version compare.
//! The client is stateless and caches nothing locally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BackupError, Result};

/// Best-effort view of the remote record, used for display only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteStatus {
    pub exists: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

/// The single-record-per-user remote store.
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Write or overwrite the one record for `user_id`.  Safe to call
    /// repeatedly; the server stamps `updated_at`.
    async fn upsert(&self, user_id: Uuid, blob: &str) -> Result<()>;

    /// Return the stored blob, or `None` when no record exists.  Absence is
    /// not an error.
    async fn fetch(&self, user_id: Uuid) -> Result<Option<String>>;

    /// Best-effort read of record existence.  Any remote failure degrades to
    /// "no backup known" rather than propagating — status is advisory.
    async fn status(&self, user_id: Uuid) -> RemoteStatus;
}

impl<T: RemoteStore> RemoteStore for std::sync::Arc<T> {
    async fn upsert(&self, user_id: Uuid, blob: &str) -> Result<()> {
        (**self).upsert(user_id, blob).await
    }

    async fn fetch(&self, user_id: Uuid) -> Result<Option<String>> {
        (**self).fetch(user_id).await
    }

    async fn status(&self, user_id: Uuid) -> RemoteStatus {
        (**self).status(user_id).await
    }
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    encrypted_blob: &'a str,
}

#[derive(Deserialize)]
struct FetchResponse {
    encrypted_blob: String,
}

#[derive(Deserialize)]
struct StatusResponse {
    exists: bool,
    updated_at: Option<DateTime<Utc>>,
}

/// [`RemoteStore`] implementation against the seha-server HTTP API.
#[derive(Clone)]
pub struct HttpRemoteClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpRemoteClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    fn backup_url(&self, user_id: Uuid) -> String {
        format!("{}/backup/{}", self.base_url.trim_end_matches('/'), user_id)
    }
}

impl RemoteStore for HttpRemoteClient {
    async fn upsert(&self, user_id: Uuid, blob: &str) -> Result<()> {
        let resp = self
            .http
            .put(self.backup_url(user_id))
            .json(&UpsertRequest { encrypted_blob: blob })
            .send()
            .await
            .map_err(|e| BackupError::Remote(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(BackupError::Remote(format!(
                "upsert failed with status {}",
                resp.status()
            )));
        }

        Ok(())
    }

    async fn fetch(&self, user_id: Uuid) -> Result<Option<String>> {
        let resp = self
            .http
            .get(self.backup_url(user_id))
            .send()
            .await
            .map_err(|e| BackupError::Remote(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(BackupError::Remote(format!(
                "fetch failed with status {}",
                resp.status()
            )));
        }

        let body: FetchResponse = resp
            .json()
            .await
            .map_err(|e| BackupError::Remote(e.to_string()))?;

        Ok(Some(body.encrypted_blob))
    }

    async fn status(&self, user_id: Uuid) -> RemoteStatus {
        let url = format!("{}/status", self.backup_url(user_id));

        let Ok(resp) = self.http.get(url).send().await else {
            return RemoteStatus::default();
        };
        if !resp.status().is_success() {
            return RemoteStatus::default();
        }

        match resp.json::<StatusResponse>().await {
            Ok(body) => RemoteStatus {
                exists: body.exists,
                updated_at: body.updated_at,
            },
            Err(_) => RemoteStatus::default(),
        }
    }
}
