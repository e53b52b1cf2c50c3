//! Snapshot store backed by a REST key-value service.
//!
//! Speaks the Redis-over-HTTP dialect used by hosted KV offerings:
//! `GET {base}/get/{key}` answers `{"result": <string|null>}` and
//! `POST {base}/set/{key}` stores the request body verbatim. Both calls carry
//! `Authorization: Bearer {token}`.

use super::persistence::{STORE_KEY, Snapshot, SnapshotStore, StoreError};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct GetResponse {
    result: Option<String>,
}

#[derive(Debug, Clone)]
pub struct KvRestStore {
    base_url: Url,
    token: String,
    key: String,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl KvRestStore {
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, StoreError> {
        Self::with_timeout(base_url, token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: &str,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| StoreError::Transport(format!("invalid KV base url '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Transport(format!(
                "KV base url '{base_url}' cannot carry a path"
            )));
        }

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(Self {
            base_url,
            token: token.into(),
            key: STORE_KEY.to_string(),
            timeout,
            http_client,
        })
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// `{base}/{command}/{key}` with the key percent-encoded.
    pub fn endpoint(&self, command: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(command).push(&self.key);
        }
        url
    }

    fn map_transport(&self, err: reqwest::Error) -> StoreError {
        if err.is_timeout() {
            StoreError::Timeout(self.timeout)
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl SnapshotStore for KvRestStore {
    fn name(&self) -> &'static str {
        "kv-rest"
    }

    async fn load(&self) -> Result<Option<Snapshot>, StoreError> {
        let url = self.endpoint("get");
        debug!(%url, "fetching ledger snapshot");

        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status(status.as_u16()));
        }

        let body: GetResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Codec(e.to_string()))?;

        match body.result {
            Some(raw) => Snapshot::from_json(&raw).map(Some),
            None => Ok(None),
        }
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let url = self.endpoint("set");
        let body = snapshot.to_json()?;
        debug!(%url, bytes = body.len(), "writing ledger snapshot");

        let response = self
            .http_client
            .post(url)
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(body)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status(status.as_u16()));
        }
        Ok(())
    }
}
