//! Snapshot persistence contract for the request ledger.
//!
//! A store holds one whole-ledger blob under a fixed key. Reads and writes
//! replace the entire blob; there is no append, lease or version check, so
//! concurrent writers resolve as last-writer-wins.

use crate::core::GuestRequest;
use crate::core::types::lenient_u64;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

// ============================================================================
// Snapshot
// ============================================================================

/// Default key the ledger blob is stored under.
pub const STORE_KEY: &str = "concierge_store";

/// Full ledger state as exchanged with a snapshot store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredSnapshot")]
pub struct Snapshot {
    pub requests: Vec<GuestRequest>,
    #[serde(rename = "totalRequestCount", default)]
    pub total_request_count: u64,
}

/// Blob shape accepted on load. Records are decoded one at a time so a
/// single odd entry never costs the rest of the ledger.
#[derive(Deserialize)]
struct StoredSnapshot {
    requests: Vec<Value>,
    #[serde(rename = "totalRequestCount", default)]
    total_request_count: Value,
}

impl From<StoredSnapshot> for Snapshot {
    fn from(stored: StoredSnapshot) -> Self {
        let mut highest = 0;
        let mut skipped = 0usize;
        let mut requests = Vec::with_capacity(stored.requests.len());

        for raw in stored.requests {
            let number = raw.get("request_number").and_then(lenient_u64).unwrap_or(0);
            highest = highest.max(number);
            match GuestRequest::from_stored(raw) {
                Some(record) => requests.push(record),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(skipped, "dropped stored requests without a usable id");
        }

        // Numbers of dropped records still count as issued.
        let count = lenient_u64(&stored.total_request_count).unwrap_or(0);
        Self {
            requests,
            total_request_count: count.max(highest),
        }
    }
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string(self).map_err(|e| StoreError::Codec(e.to_string()))
    }

    pub fn from_json(raw: &str) -> Result<Self, StoreError> {
        serde_json::from_str(raw).map_err(|e| StoreError::Codec(e.to_string()))
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("store answered with status {0}")]
    Status(u16),

    #[error("snapshot codec error: {0}")]
    Codec(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
}

// ============================================================================
// Store capability
// ============================================================================

/// Whole-blob get/set against wherever the shared ledger lives.
///
/// `load` returning `Ok(None)` means "nothing stored yet". Errors are for the
/// caller to log and degrade on; they never imply the ledger is unusable.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Whether a saved snapshot outlives the in-memory ledger that wrote it.
    fn is_persistent(&self) -> bool {
        true
    }

    async fn load(&self) -> Result<Option<Snapshot>, StoreError>;

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
}
