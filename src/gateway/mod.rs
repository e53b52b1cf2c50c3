//! Request gateway: the four guest/staff operations over one ledger.
//!
//! Every operation first refreshes the ledger from the snapshot store and
//! every mutation flushes it back. The ledger lock is only held for the
//! in-memory step, never across a store round-trip, so a refresh/mutate/flush
//! sequence can interleave with others and the last flush wins.

use crate::core::{DeskError, GuestRequest, RequestStatus, Result, Submission};
use crate::ledger::Ledger;
use crate::storage::{NoopStore, Snapshot, SnapshotStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

pub const INVALID_JSON_MESSAGE: &str = "Invalid JSON";
pub const MISSING_ID_MESSAGE: &str = "Missing id";
pub const NOT_FOUND_MESSAGE: &str = "Not found";
pub const INVALID_UPDATE_MESSAGE: &str = "Invalid id or status";
pub const REQUEST_NOT_FOUND_MESSAGE: &str = "Request not found";

// ============================================================================
// Response payloads
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub ok: bool,
    pub id: String,
    pub request_number: u64,
    /// Request numbers issued so far, not the number of retained records.
    pub total_requests: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestList {
    pub requests: Vec<GuestRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub request: GuestRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub ok: bool,
    pub id: String,
    pub status: RequestStatus,
    pub status_updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_requests: u64,
}

// ============================================================================
// Gateway
// ============================================================================

pub struct RequestGateway {
    ledger: RwLock<Ledger>,
    store: Arc<dyn SnapshotStore>,
    store_timeout: Duration,
}

impl RequestGateway {
    pub fn new(ledger: Ledger, store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            ledger: RwLock::new(ledger),
            store,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Gateway whose state lives only as long as this value.
    pub fn in_memory(ledger: Ledger) -> Self {
        Self::new(ledger, Arc::new(NoopStore))
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    /// Submit: records a guest request and returns its identity.
    pub async fn submit(&self, submission: Submission) -> SubmitReceipt {
        self.refresh().await;

        let (record, total_requests, snapshot) = {
            let mut ledger = self.ledger.write().await;
            let record = ledger.create(submission);
            let snapshot = self.store.is_persistent().then(|| ledger.snapshot());
            (record, ledger.total_requests(), snapshot)
        };

        let guest_fields = Value::Object(record.fields.clone());
        info!(
            request_number = record.request_number,
            id = %record.id,
            fields = %guest_fields,
            "guest request received"
        );

        if let Some(snapshot) = snapshot {
            self.flush(snapshot).await;
        }

        SubmitReceipt {
            ok: true,
            id: record.id,
            request_number: record.request_number,
            total_requests,
        }
    }

    /// Submit from a raw JSON body. Nothing is touched if the body is not a JSON object.
    pub async fn submit_json(&self, body: &[u8]) -> Result<SubmitReceipt> {
        let submission =
            Submission::from_slice(body).map_err(|_| DeskError::malformed(INVALID_JSON_MESSAGE))?;
        Ok(self.submit(submission).await)
    }

    /// List: every retained record, oldest first.
    pub async fn list(&self) -> RequestList {
        self.refresh().await;
        RequestList {
            requests: self.ledger.read().await.list(),
        }
    }

    /// Get one: the first record with the given id.
    pub async fn get(&self, id: Option<&str>) -> Result<RequestEnvelope> {
        let id = id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| DeskError::validation(MISSING_ID_MESSAGE))?;

        self.refresh().await;
        let ledger = self.ledger.read().await;
        let request = ledger
            .find_by_id(id)
            .cloned()
            .ok_or_else(|| DeskError::not_found(NOT_FOUND_MESSAGE))?;
        Ok(RequestEnvelope { request })
    }

    /// Update status: moves a record through the status vocabulary.
    ///
    /// Both inputs are validated before the store is consulted.
    pub async fn update_status(&self, id: Option<&str>, status: Option<&str>) -> Result<StatusUpdate> {
        let id = id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| DeskError::validation(INVALID_UPDATE_MESSAGE))?;
        let status: RequestStatus = status
            .ok_or_else(|| DeskError::validation(INVALID_UPDATE_MESSAGE))?
            .parse()
            .map_err(|_| DeskError::validation(INVALID_UPDATE_MESSAGE))?;

        self.refresh().await;

        let (record, snapshot) = {
            let mut ledger = self.ledger.write().await;
            let record = ledger
                .update_status(id, status.as_str())
                .map_err(|err| match err {
                    DeskError::NotFound(_) => DeskError::not_found(REQUEST_NOT_FOUND_MESSAGE),
                    other => other,
                })?;
            let snapshot = self.store.is_persistent().then(|| ledger.snapshot());
            (record, snapshot)
        };

        info!(
            id = %record.id,
            request_number = record.request_number,
            status = %record.status,
            "request status updated"
        );

        if let Some(snapshot) = snapshot {
            self.flush(snapshot).await;
        }

        Ok(StatusUpdate {
            ok: true,
            id: record.id,
            status: record.status,
            status_updated_at: record.status_updated_at,
        })
    }

    /// Update status from a raw `{id, status}` JSON body; a numeric id is accepted.
    pub async fn update_status_json(&self, body: &[u8]) -> Result<StatusUpdate> {
        let value: Value =
            serde_json::from_slice(body).map_err(|_| DeskError::malformed(INVALID_JSON_MESSAGE))?;
        let Value::Object(fields) = value else {
            return Err(DeskError::malformed(INVALID_JSON_MESSAGE));
        };

        let id = match fields.get("id") {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        };
        let status = fields.get("status").and_then(Value::as_str);

        self.update_status(id.as_deref(), status).await
    }

    /// Request numbers issued so far.
    pub async fn stats(&self) -> Stats {
        self.refresh().await;
        Stats {
            total_requests: self.ledger.read().await.total_requests(),
        }
    }

    /// Current in-memory state, without consulting the store.
    pub async fn snapshot(&self) -> Snapshot {
        self.ledger.read().await.snapshot()
    }

    async fn refresh(&self) {
        if !self.store.is_persistent() {
            return;
        }
        if let Some(snapshot) = self.load_snapshot().await {
            debug!(
                store = self.store.name(),
                records = snapshot.requests.len(),
                total_requests = snapshot.total_request_count,
                "ledger refreshed from store"
            );
            self.ledger.write().await.restore(snapshot);
        }
    }

    async fn load_snapshot(&self) -> Option<Snapshot> {
        match tokio::time::timeout(self.store_timeout, self.store.load()).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(err)) => {
                warn!(store = self.store.name(), error = %err, "snapshot load failed, using in-memory ledger");
                None
            }
            Err(_) => {
                warn!(
                    store = self.store.name(),
                    timeout_ms = self.store_timeout.as_millis() as u64,
                    "snapshot load timed out, using in-memory ledger"
                );
                None
            }
        }
    }

    async fn flush(&self, snapshot: Snapshot) {
        match tokio::time::timeout(self.store_timeout, self.store.save(&snapshot)).await {
            Ok(Ok(())) => debug!(
                store = self.store.name(),
                records = snapshot.requests.len(),
                "ledger flushed to store"
            ),
            Ok(Err(err)) => {
                warn!(store = self.store.name(), error = %err, "snapshot save failed, change kept in memory only");
            }
            Err(_) => {
                warn!(
                    store = self.store.name(),
                    timeout_ms = self.store_timeout.as_millis() as u64,
                    "snapshot save timed out, change kept in memory only"
                );
            }
        }
    }
}
