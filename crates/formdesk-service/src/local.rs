use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use formdesk_core::consistency::{self, AuditReport};
use formdesk_core::naming;
use formdesk_core::template::assign_ids;
use formdesk_core::{AttachmentRef, TemplateInput, TemplateRecord, UploadFile, UPLOADS_PREFIX};
use formdesk_db::RecordStore;
use formdesk_store::{ObjectStore, StoreError};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};
use url::Url;

use crate::{ServiceError, TemplateService};

/// Fresh names drawn before an upload gives up on a colliding stored name.
const NAME_ATTEMPTS: usize = 4;

/// Recently deleted stored names remembered for idempotent repeats.
const TOMBSTONE_CAPACITY: usize = 1024;

pub struct ServiceConfig {
    /// Externally reachable base URL; attachment URLs are `<base>/uploads/<storedName>`.
    pub public_url: String,
    /// Upper bound for each document or file operation and for waiting on the write lock.
    pub io_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            public_url: "http://localhost:5000".to_string(),
            io_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Default)]
struct Tombstones {
    names: VecDeque<String>,
}

impl Tombstones {
    fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    fn remember(&mut self, name: &str) {
        if self.contains(name) {
            return;
        }
        if self.names.len() == TOMBSTONE_CAPACITY {
            self.names.pop_front();
        }
        self.names.push_back(name.to_string());
    }
}

/// Attachment manager over a record document and a content directory.
///
/// Every mutation runs its whole read-modify-write span under one lock, so
/// concurrent uploads, deletes and replaces never overwrite each other.
pub struct LocalService {
    records: Arc<dyn RecordStore>,
    files: Arc<dyn ObjectStore>,
    public_url: Url,
    io_timeout: Duration,
    writer: Mutex<Tombstones>,
}

impl LocalService {
    pub fn new(
        records: Arc<dyn RecordStore>,
        files: Arc<dyn ObjectStore>,
        config: &ServiceConfig,
    ) -> Result<Self, ServiceError> {
        let public_url = Url::parse(&config.public_url).map_err(|e| {
            ServiceError::InvalidInput(format!("public url {:?}: {e}", config.public_url))
        })?;
        if public_url.cannot_be_a_base() {
            return Err(ServiceError::InvalidInput(format!(
                "public url {:?} cannot carry a path",
                config.public_url
            )));
        }
        Ok(Self {
            records,
            files,
            public_url,
            io_timeout: config.io_timeout,
            writer: Mutex::new(Tombstones::default()),
        })
    }

    /// Where clients fetch a stored file from.
    pub fn attachment_url(&self, stored_name: &str) -> String {
        let mut url = self.public_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push(UPLOADS_PREFIX.trim_start_matches('/'))
                .push(stored_name);
        }
        url.to_string()
    }

    async fn bounded<F: Future>(&self, what: &str, fut: F) -> Result<F::Output, ServiceError> {
        tokio::time::timeout(self.io_timeout, fut)
            .await
            .map_err(|_| ServiceError::Timeout(format!("{what} exceeded {:?}", self.io_timeout)))
    }

    async fn lock(&self) -> Result<MutexGuard<'_, Tombstones>, ServiceError> {
        self.bounded("waiting for write lock", self.writer.lock()).await
    }

    async fn load(&self) -> Result<Vec<TemplateRecord>, ServiceError> {
        Ok(self
            .bounded("reading templates", self.records.read_all())
            .await??)
    }

    async fn persist(&self, records: &[TemplateRecord]) -> Result<(), ServiceError> {
        Ok(self
            .bounded("writing templates", self.records.replace_all(records))
            .await??)
    }

    /// Write one payload under a fresh stored name.
    async fn store_file(&self, file: &UploadFile) -> Result<AttachmentRef, ServiceError> {
        for _ in 0..NAME_ATTEMPTS {
            let stored_name = naming::new_stored_name(&file.original_name);
            let put = self.files.put_new(&stored_name, file.data.clone());
            match self.bounded("writing file", put).await {
                Ok(Ok(size)) => {
                    return Ok(AttachmentRef {
                        url: self.attachment_url(&stored_name),
                        stored_name,
                        original_name: file.original_name.clone(),
                        size,
                    })
                }
                Ok(Err(StoreError::AlreadyExists(_))) => {
                    debug!(stored_name = %stored_name, "stored name collision, drawing a new one");
                }
                Ok(Err(e)) => {
                    return Err(ServiceError::UploadFailed(format!(
                        "{}: {e}",
                        file.original_name
                    )))
                }
                Err(timeout) => {
                    // The abandoned write may have left a partial file behind.
                    self.discard_names(&[stored_name]).await;
                    return Err(timeout);
                }
            }
        }
        Err(ServiceError::UploadFailed(format!(
            "{}: no free stored name after {NAME_ATTEMPTS} attempts",
            file.original_name
        )))
    }

    /// Best-effort removal of files written by a call that is about to fail.
    async fn discard_names(&self, names: &[String]) {
        for name in names {
            match self.bounded("discarding file", self.files.delete(name)).await {
                Ok(Ok(_)) => debug!(stored_name = %name, "discarded file from failed upload"),
                Ok(Err(e)) => warn!(stored_name = %name, "could not discard file: {e}"),
                Err(e) => warn!(stored_name = %name, "could not discard file: {e}"),
            }
        }
    }

    async fn discard(&self, written: &[AttachmentRef]) {
        let names: Vec<String> = written.iter().map(|a| a.stored_name.clone()).collect();
        self.discard_names(&names).await;
    }
}

#[async_trait]
impl TemplateService for LocalService {
    async fn list_templates(&self) -> Result<Vec<TemplateRecord>, ServiceError> {
        self.load().await
    }

    async fn replace_templates(
        &self,
        templates: Vec<TemplateInput>,
    ) -> Result<Vec<TemplateRecord>, ServiceError> {
        let records = assign_ids(templates)?;
        let _guard = self.lock().await?;
        self.persist(&records).await?;
        info!(count = records.len(), "templates replaced");
        Ok(records)
    }

    async fn upload_attachments(
        &self,
        template_id: i64,
        files: Vec<UploadFile>,
    ) -> Result<Vec<AttachmentRef>, ServiceError> {
        if files.is_empty() {
            return Err(ServiceError::InvalidInput("no files uploaded".into()));
        }

        let _guard = self.lock().await?;
        let mut records = self.load().await?;
        let idx = records
            .iter()
            .position(|t| t.id == template_id)
            .ok_or_else(|| ServiceError::TemplateNotFound(template_id.to_string()))?;

        let mut written = Vec::with_capacity(files.len());
        for file in &files {
            match self.store_file(file).await {
                Ok(att) => written.push(att),
                Err(e) => {
                    warn!(
                        template_id,
                        original_name = %file.original_name,
                        "upload aborted after {} of {} files: {e}",
                        written.len(),
                        files.len()
                    );
                    self.discard(&written).await;
                    return Err(e);
                }
            }
        }

        records[idx].attachments.extend(written.iter().cloned());
        match self.persist(&records).await {
            Ok(()) => {}
            // The write may still land; dropping the files could leave dangling references.
            Err(e @ ServiceError::Timeout(_)) => {
                warn!(template_id, "template write timed out, keeping uploaded files: {e}");
                return Err(e);
            }
            Err(e) => {
                self.discard(&written).await;
                return Err(e);
            }
        }

        info!(template_id, count = written.len(), "attachments uploaded");
        Ok(written)
    }

    async fn delete_attachment(&self, stored_name: &str) -> Result<(), ServiceError> {
        naming::validate_stored_name(stored_name)?;

        let mut tombstones = self.lock().await?;
        let mut records = self.load().await?;
        if !records.iter().any(|t| t.references(stored_name)) {
            if tombstones.contains(stored_name) {
                debug!(stored_name, "already deleted");
                return Ok(());
            }
            return Err(ServiceError::AttachmentNotFound(stored_name.to_string()));
        }

        // File first: an interruption below leaves a dangling reference that
        // the next delete of this name clears, never an unreachable file.
        match self
            .bounded("deleting file", self.files.delete(stored_name))
            .await?
        {
            Ok(true) => {}
            Ok(false) => warn!(stored_name, "file already absent, removing dangling reference"),
            Err(e) => return Err(ServiceError::DeletionFailed(format!("{stored_name}: {e}"))),
        }

        let removed: usize = records
            .iter_mut()
            .map(|t| t.remove_attachment(stored_name))
            .sum();
        self.persist(&records).await?;
        tombstones.remember(stored_name);
        info!(stored_name, references = removed, "attachment deleted");
        Ok(())
    }

    async fn audit(&self) -> Result<AuditReport, ServiceError> {
        // Hold the writer so an upload between its file writes and its record
        // write is not reported as orphans.
        let _guard = self.lock().await?;
        let records = self.load().await?;
        let files = self
            .bounded("listing content directory", self.files.list(""))
            .await?
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        Ok(consistency::audit(&records, &files))
    }
}
