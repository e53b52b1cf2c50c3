pub mod file;
pub mod kv_rest;
pub mod memory;
pub mod persistence;

pub use file::FileBlobStore;
pub use kv_rest::KvRestStore;
pub use memory::{MemoryBlobStore, NoopStore};
pub use persistence::{STORE_KEY, Snapshot, SnapshotStore, StoreError};
