use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::{default_content_dir, ObjectStore, StoreConfig, StoreError};

/// Content directory on the local filesystem.
pub struct LocalStore {
    base_dir: PathBuf,
}

impl LocalStore {
    pub fn new(config: &StoreConfig) -> Self {
        let base_dir = config
            .content_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(default_content_dir);
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Map a key onto a path strictly inside `base_dir`.
    fn resolve(&self, key: &str) -> Result<PathBuf, StoreError> {
        let rel = Path::new(key);
        let confined = !key.is_empty()
            && !key.contains('\\')
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !confined {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.base_dir.join(rel))
    }
}

async fn write_synced(file: &mut tokio::fs::File, data: &[u8]) -> std::io::Result<u64> {
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(file.metadata().await?.len())
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put_new(&self, key: &str, data: Bytes) -> Result<u64, StoreError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Internal(format!("mkdir: {e}")))?;
        }
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists(key.to_string()))
            }
            Err(e) => {
                return Err(StoreError::Internal(format!(
                    "create {}: {e}",
                    path.display()
                )))
            }
        };
        match write_synced(&mut file, &data).await {
            Ok(size) => Ok(size),
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(&path).await;
                Err(StoreError::Internal(format!(
                    "write {}: {e}",
                    path.display()
                )))
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("delete {}: already absent", path.display());
                Ok(false)
            }
            Err(e) => Err(StoreError::Internal(format!(
                "delete {}: {e}",
                path.display()
            ))),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let dir = if prefix.is_empty() {
            self.base_dir.clone()
        } else {
            self.resolve(prefix)?
        };
        if !dir.exists() {
            return Ok(vec![]);
        }
        let mut keys = Vec::new();
        let mut stack = vec![dir];
        while let Some(current) = stack.pop() {
            let mut entries = match tokio::fs::read_dir(&current).await {
                Ok(e) => e,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(StoreError::Internal(format!(
                        "list {}: {e}",
                        current.display()
                    )))
                }
            };
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| StoreError::Internal(format!("read_dir entry: {e}")))?
            {
                let path = entry.path();
                let ft = entry
                    .file_type()
                    .await
                    .map_err(|e| StoreError::Internal(format!("file_type: {e}")))?;
                if ft.is_dir() {
                    stack.push(path);
                } else if let Ok(rel) = path.strip_prefix(&self.base_dir) {
                    keys.push(rel.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}
