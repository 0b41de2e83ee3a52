use async_trait::async_trait;
use formdesk_core::consistency::AuditReport;
use formdesk_core::{AttachmentRef, FormdeskError, TemplateInput, TemplateRecord, UploadFile};
use formdesk_db::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("template store unreadable: {0}")]
    StoreUnreadable(String),

    #[error("template store write failed: {0}")]
    StoreWrite(String),

    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("attachment not found: {0}")]
    AttachmentNotFound(String),

    #[error("invalid filename: {0}")]
    InvalidName(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("deletion failed: {0}")]
    DeletionFailed(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Stable machine-readable kind, carried in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::StoreUnreadable(_) => "store_unreadable",
            ServiceError::StoreWrite(_) => "store_write",
            ServiceError::TemplateNotFound(_) => "template_not_found",
            ServiceError::AttachmentNotFound(_) => "attachment_not_found",
            ServiceError::InvalidName(_) => "invalid_name",
            ServiceError::InvalidInput(_) => "invalid_input",
            ServiceError::UploadFailed(_) => "upload_failed",
            ServiceError::DeletionFailed(_) => "deletion_failed",
            ServiceError::Timeout(_) => "timeout",
            ServiceError::Internal(_) => "internal",
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            ServiceError::StoreUnreadable(d)
            | ServiceError::StoreWrite(d)
            | ServiceError::TemplateNotFound(d)
            | ServiceError::AttachmentNotFound(d)
            | ServiceError::InvalidName(d)
            | ServiceError::InvalidInput(d)
            | ServiceError::UploadFailed(d)
            | ServiceError::DeletionFailed(d)
            | ServiceError::Timeout(d)
            | ServiceError::Internal(d) => d,
        }
    }

    /// Rebuild an error from its `code()` and `detail()`.
    pub fn from_code(code: &str, detail: String) -> Self {
        match code {
            "store_unreadable" => ServiceError::StoreUnreadable(detail),
            "store_write" => ServiceError::StoreWrite(detail),
            "template_not_found" => ServiceError::TemplateNotFound(detail),
            "attachment_not_found" => ServiceError::AttachmentNotFound(detail),
            "invalid_name" => ServiceError::InvalidName(detail),
            "invalid_input" => ServiceError::InvalidInput(detail),
            "upload_failed" => ServiceError::UploadFailed(detail),
            "deletion_failed" => ServiceError::DeletionFailed(detail),
            "timeout" => ServiceError::Timeout(detail),
            _ => ServiceError::Internal(detail),
        }
    }

    /// Whether retrying the same call later can succeed without changing it.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Timeout(_))
    }
}

impl From<DbError> for ServiceError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Unreadable(msg) => ServiceError::StoreUnreadable(msg),
            other => ServiceError::StoreWrite(other.to_string()),
        }
    }
}

impl From<FormdeskError> for ServiceError {
    fn from(e: FormdeskError) -> Self {
        match e {
            FormdeskError::InvalidName(msg) => ServiceError::InvalidName(msg),
            FormdeskError::InvalidInput(msg) => ServiceError::InvalidInput(msg),
        }
    }
}

/// Template catalog and attachment operations.
///
/// `LocalService` owns the record document and content directory directly.
/// `HttpService` talks to a running formdesk-server.
#[async_trait]
pub trait TemplateService: Send + Sync {
    // -- Templates --
    async fn list_templates(&self) -> Result<Vec<TemplateRecord>, ServiceError>;

    /// Replace the whole collection. Inputs without an id get one assigned.
    async fn replace_templates(
        &self,
        templates: Vec<TemplateInput>,
    ) -> Result<Vec<TemplateRecord>, ServiceError>;

    // -- Attachments --
    async fn upload_attachments(
        &self,
        template_id: i64,
        files: Vec<UploadFile>,
    ) -> Result<Vec<AttachmentRef>, ServiceError>;

    async fn delete_attachment(&self, stored_name: &str) -> Result<(), ServiceError>;

    // -- Consistency --
    async fn audit(&self) -> Result<AuditReport, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trips_every_variant() {
        let all = [
            ServiceError::StoreUnreadable("a".into()),
            ServiceError::StoreWrite("a".into()),
            ServiceError::TemplateNotFound("a".into()),
            ServiceError::AttachmentNotFound("a".into()),
            ServiceError::InvalidName("a".into()),
            ServiceError::InvalidInput("a".into()),
            ServiceError::UploadFailed("a".into()),
            ServiceError::DeletionFailed("a".into()),
            ServiceError::Timeout("a".into()),
            ServiceError::Internal("a".into()),
        ];
        for e in &all {
            let rebuilt = ServiceError::from_code(e.code(), e.detail().to_string());
            assert_eq!(rebuilt.code(), e.code());
            assert_eq!(rebuilt.to_string(), e.to_string());
        }
        assert_eq!(ServiceError::from_code("bogus", "x".into()).code(), "internal");
    }

    #[test]
    fn only_timeouts_are_retryable() {
        assert!(ServiceError::Timeout("io".into()).is_retryable());
        assert!(!ServiceError::UploadFailed("io".into()).is_retryable());
        assert!(!ServiceError::TemplateNotFound("1".into()).is_retryable());
    }

    #[test]
    fn db_errors_map_to_store_variants() {
        let e: ServiceError = DbError::Unreadable("bad json".into()).into();
        assert!(matches!(e, ServiceError::StoreUnreadable(_)));
        let e: ServiceError = DbError::Write("disk full".into()).into();
        assert!(matches!(e, ServiceError::StoreWrite(_)));
    }
}
