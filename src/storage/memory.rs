use super::persistence::{Snapshot, SnapshotStore, StoreError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Store for the in-memory-only deployment: nothing is loaded, saves vanish.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStore;

#[async_trait]
impl SnapshotStore for NoopStore {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn is_persistent(&self) -> bool {
        false
    }

    async fn load(&self) -> Result<Option<Snapshot>, StoreError> {
        Ok(None)
    }

    async fn save(&self, _snapshot: &Snapshot) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Process-local blob shared by every clone.
///
/// Gateways built on clones of the same store behave like isolated runtime
/// instances talking to one external key-value service. The blob is kept
/// serialized so it goes through the same codec as the remote backends.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blob: Arc<Mutex<Option<String>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw serialized blob, if any.
    pub fn raw(&self) -> Option<String> {
        self.blob.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Overwrites the blob with arbitrary text.
    pub fn put_raw(&self, raw: impl Into<String>) {
        *self.blob.lock().unwrap_or_else(|p| p.into_inner()) = Some(raw.into());
    }
}

#[async_trait]
impl SnapshotStore for MemoryBlobStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self) -> Result<Option<Snapshot>, StoreError> {
        match self.raw() {
            Some(raw) => Snapshot::from_json(&raw).map(Some),
            None => Ok(None),
        }
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        self.put_raw(snapshot.to_json()?);
        Ok(())
    }
}
