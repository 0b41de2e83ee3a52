mod local;

pub use local::LocalStore;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("store error: {0}")]
    Internal(String),
}

/// Byte storage for uploaded files, keyed by relative paths.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create a new object, refusing to overwrite. Returns the stored size in bytes.
    async fn put_new(&self, key: &str, data: Bytes) -> Result<u64, StoreError>;

    /// Delete an object. Returns `false` if it was already absent.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// List object keys under a prefix (`""` for everything).
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

// -- Configuration --

/// Configuration for the content store.
pub struct StoreConfig {
    /// Directory holding uploaded files. Defaults to `$XDG_DATA_HOME/formdesk/uploads`.
    pub content_dir: Option<String>,
}

/// Reproduce the default data directory of `formdesk_db::data_dir()`
/// without taking a dependency on the db crate.
pub fn default_content_dir() -> PathBuf {
    let base = if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg)
    } else if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".local/share")
    } else {
        PathBuf::from(".")
    };
    base.join("formdesk").join("uploads")
}

// -- Factory --

/// Create the content store, making sure its directory exists.
pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn ObjectStore>, StoreError> {
    let store = LocalStore::new(config);
    std::fs::create_dir_all(store.base_dir()).map_err(|e| {
        StoreError::Internal(format!("mkdir {}: {e}", store.base_dir().display()))
    })?;
    Ok(Arc::new(store))
}
