// ============================================================================
// Concierge Request Store
// ============================================================================

pub mod config;
pub mod core;
pub mod gateway;
pub mod ledger;
pub mod storage;
pub mod web;

// Re-export main types for convenience
pub use crate::config::{AppConfig, StoreBackend};
pub use crate::core::{DeskError, GuestRequest, RequestStatus, Result, Submission};
pub use crate::gateway::{RequestEnvelope, RequestGateway, RequestList, Stats, StatusUpdate, SubmitReceipt};
pub use crate::ledger::{EvictionPolicy, Ledger, MAX_REQUESTS, Sequencer};
pub use crate::storage::{
    FileBlobStore, KvRestStore, MemoryBlobStore, NoopStore, STORE_KEY, Snapshot, SnapshotStore,
    StoreError,
};
pub use crate::web::{AppState, build_router};
