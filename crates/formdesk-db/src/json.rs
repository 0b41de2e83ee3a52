use std::path::{Path, PathBuf};

use async_trait::async_trait;
use formdesk_core::TemplateRecord;
use tokio::io::AsyncWriteExt;
use tracing::info;
use uuid::Uuid;

use crate::{DbError, RecordStore};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Template collection stored as one pretty-printed JSON array on disk.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Open the document at `path`, creating its directory and an empty `[]`
    /// document when it does not exist yet.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        if !path.exists() {
            let tmp = temp_path(path);
            std::fs::write(&tmp, b"[]")?;
            std::fs::rename(&tmp, path)?;
            info!("created empty template document at {}", path.display());
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn read_all(&self) -> Result<Vec<TemplateRecord>, DbError> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DbError::Unreadable(format!(
                    "{} is missing",
                    self.path.display()
                )))
            }
            Err(e) => {
                return Err(DbError::Unreadable(format!(
                    "read {}: {e}",
                    self.path.display()
                )))
            }
        };
        let body = data.strip_prefix(UTF8_BOM).unwrap_or(&data);
        serde_json::from_slice(body)
            .map_err(|e| DbError::Unreadable(format!("parse {}: {e}", self.path.display())))
    }

    async fn replace_all(&self, records: &[TemplateRecord]) -> Result<(), DbError> {
        let body = serde_json::to_vec_pretty(records)
            .map_err(|e| DbError::Write(format!("serialize: {e}")))?;
        let tmp = temp_path(&self.path);
        if let Err(e) = write_then_rename(&tmp, &self.path, &body).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(DbError::Write(format!("{}: {e}", self.path.display())));
        }
        Ok(())
    }
}

/// Sibling temp file so the final rename never crosses filesystems.
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "templates.json".to_string());
    path.with_file_name(format!(".{name}-{}.tmp", Uuid::new_v4()))
}

async fn write_then_rename(tmp: &Path, dest: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(tmp).await?;
    file.write_all(body).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(tmp, dest).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, name: &str) -> TemplateRecord {
        let mut r: TemplateRecord =
            serde_json::from_str(&format!(r#"{{"id": {id}}}"#)).unwrap();
        r.name = name.to_string();
        r
    }

    fn leftover_temp_files(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|n| n.ends_with(".tmp"))
            .collect()
    }

    #[tokio::test]
    async fn open_bootstraps_empty_document() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("data/templates.json");

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn open_leaves_existing_document_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("templates.json");
        std::fs::write(&path, r#"[{"id": 9, "name": "kept"}]"#).unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        let all = store.read_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "kept");
    }

    #[tokio::test]
    async fn replace_then_read_preserves_order() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(&tmp.path().join("templates.json")).unwrap();

        store
            .replace_all(&[record(3, "c"), record(1, "a"), record(2, "b")])
            .await
            .unwrap();
        let ids: Vec<i64> = store.read_all().await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert!(leftover_temp_files(tmp.path()).is_empty());
    }

    #[tokio::test]
    async fn document_is_pretty_printed_camel_case() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("templates.json");
        let store = JsonFileStore::open(&path).unwrap();
        let mut r = record(1, "Template 1");
        r.template_no = "545454".into();
        store.replace_all(&[r]).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  {"));
        assert!(text.contains("\"templateNo\": \"545454\""));
    }

    #[tokio::test]
    async fn missing_document_is_unreadable() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("templates.json");
        let store = JsonFileStore::open(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let err = store.read_all().await.unwrap_err();
        assert!(matches!(err, DbError::Unreadable(_)));
    }

    #[tokio::test]
    async fn malformed_document_is_unreadable() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("templates.json");
        let store = JsonFileStore::open(&path).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        let err = store.read_all().await.unwrap_err();
        assert!(matches!(err, DbError::Unreadable(_)));
    }

    #[tokio::test]
    async fn leading_bom_is_tolerated() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("templates.json");
        std::fs::write(&path, b"\xEF\xBB\xBF[{\"id\": 1}]").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.read_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_replace_removes_temp_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("templates.json");
        let store = JsonFileStore::open(&path).unwrap();
        store.replace_all(&[record(1, "before")]).await.unwrap();

        // A directory at the destination makes the final rename fail.
        let blocked = JsonFileStore {
            path: tmp.path().join("blocked"),
        };
        std::fs::create_dir_all(tmp.path().join("blocked/inner")).unwrap();
        let err = blocked.replace_all(&[record(2, "after")]).await.unwrap_err();
        assert!(matches!(err, DbError::Write(_)));
        assert!(leftover_temp_files(tmp.path()).is_empty());

        let all = store.read_all().await.unwrap();
        assert_eq!(all[0].name, "before");
    }
}
