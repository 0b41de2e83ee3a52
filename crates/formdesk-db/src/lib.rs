mod json;
pub mod seed;

use std::path::PathBuf;

use async_trait::async_trait;
use formdesk_core::TemplateRecord;
use thiserror::Error;

pub use json::JsonFileStore;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("template document unreadable: {0}")]
    Unreadable(String),

    #[error("template document write failed: {0}")]
    Write(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Whole-document storage for the template collection.
///
/// There is no per-record API: every logical update is read everything,
/// transform in memory, replace everything. Callers serialize their
/// read-modify-write spans themselves.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Load the full collection. Missing or malformed documents are `DbError::Unreadable`.
    async fn read_all(&self) -> Result<Vec<TemplateRecord>, DbError>;

    /// Atomically overwrite the document with `records`.
    async fn replace_all(&self, records: &[TemplateRecord]) -> Result<(), DbError>;
}

/// Base directory for formdesk data: `$XDG_DATA_HOME/formdesk`, falling back
/// to `~/.local/share/formdesk`.
pub fn data_dir() -> PathBuf {
    let base = if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg)
    } else if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".local/share")
    } else {
        PathBuf::from(".")
    };
    base.join("formdesk")
}

pub fn default_data_file() -> PathBuf {
    data_dir().join("templates.json")
}
