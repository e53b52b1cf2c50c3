use super::persistence::{Snapshot, SnapshotStore, StoreError};
use async_trait::async_trait;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Keeps the ledger blob in a local JSON file so it survives process restarts.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    path: PathBuf,
}

impl FileBlobStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut temp = NamedTempFile::new_in(&dir)?;
        temp.write_all(contents)?;
        temp.flush()?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for FileBlobStore {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn load(&self) -> Result<Option<Snapshot>, StoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        Snapshot::from_json(&raw).map(Some)
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let contents = snapshot.to_json()?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::write_atomic(&path, contents.as_bytes()))
            .await
            .map_err(|e| StoreError::Io(io::Error::other(e)))??;
        Ok(())
    }
}
