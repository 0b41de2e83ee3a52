use async_trait::async_trait;
use formdesk_core::consistency::AuditReport;
use formdesk_core::{AttachmentRef, TemplateInput, TemplateRecord, UploadFile};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::{ServiceError, TemplateService};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    files: Vec<AttachmentRef>,
}

#[derive(Debug, Deserialize)]
struct ReplaceResponse {
    templates: Vec<TemplateRecord>,
}

/// Async HTTP client implementation of TemplateService.
/// Connects to a running formdesk-server.
pub struct HttpService {
    base_url: String,
    client: Client,
}

impl HttpService {
    pub fn new(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            base_url,
            client: Client::new(),
        }
    }

    /// Check if the server is reachable.
    pub async fn health_check(&self) -> Result<(), ServiceError> {
        let resp = self
            .client
            .get(format!("{}/api/health", self.base_url))
            .send()
            .await
            .map_err(|e| ServiceError::Internal(format!("connection failed: {e}")))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ServiceError::Internal(format!(
                "health check failed: {}",
                resp.status()
            )))
        }
    }

    /// `DELETE /api/files/{name}` with the name percent-encoded as one path segment.
    fn file_url(&self, stored_name: &str) -> Result<Url, ServiceError> {
        let mut url = Url::parse(&format!("{}/api/files", self.base_url))
            .map_err(|e| ServiceError::Internal(format!("bad base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ServiceError::Internal("base url cannot carry a path".into()))?
            .push(stored_name);
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        let resp = self
            .client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        handle_response(resp).await
    }
}

async fn handle_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ServiceError> {
    let status = resp.status();
    if status.is_success() {
        resp.json::<T>()
            .await
            .map_err(|e| ServiceError::Internal(format!("json decode: {e}")))
    } else {
        Err(parse_error_with_status(status, resp).await)
    }
}

async fn parse_error_with_status(status: StatusCode, resp: reqwest::Response) -> ServiceError {
    let body = resp.text().await.unwrap_or_default();
    let parsed = serde_json::from_str::<serde_json::Value>(&body).ok();
    let code = parsed
        .as_ref()
        .and_then(|v| v["code"].as_str().map(String::from));
    let detail = parsed
        .as_ref()
        .and_then(|v| {
            v["detail"]
                .as_str()
                .or_else(|| v["error"].as_str())
                .map(String::from)
        })
        .unwrap_or(body);

    match code {
        Some(code) => ServiceError::from_code(&code, detail),
        None if status == StatusCode::BAD_REQUEST => ServiceError::InvalidInput(detail),
        None if status == StatusCode::SERVICE_UNAVAILABLE => ServiceError::Timeout(detail),
        None => ServiceError::Internal(format!("{status}: {detail}")),
    }
}

#[async_trait]
impl TemplateService for HttpService {
    async fn list_templates(&self) -> Result<Vec<TemplateRecord>, ServiceError> {
        self.get_json("/api/templates").await
    }

    async fn replace_templates(
        &self,
        templates: Vec<TemplateInput>,
    ) -> Result<Vec<TemplateRecord>, ServiceError> {
        let resp = self
            .client
            .put(format!("{}/api/templates", self.base_url))
            .json(&templates)
            .send()
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        let body: ReplaceResponse = handle_response(resp).await?;
        Ok(body.templates)
    }

    async fn upload_attachments(
        &self,
        template_id: i64,
        files: Vec<UploadFile>,
    ) -> Result<Vec<AttachmentRef>, ServiceError> {
        let mut form = Form::new().text("templateId", template_id.to_string());
        for file in files {
            form = form.part(
                "files",
                Part::bytes(file.data.to_vec()).file_name(file.original_name),
            );
        }
        let resp = self
            .client
            .post(format!("{}/api/upload", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        let body: UploadResponse = handle_response(resp).await?;
        Ok(body.files)
    }

    async fn delete_attachment(&self, stored_name: &str) -> Result<(), ServiceError> {
        let resp = self
            .client
            .delete(self.file_url(stored_name)?)
            .send()
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(parse_error_with_status(status, resp).await)
        }
    }

    async fn audit(&self) -> Result<AuditReport, ServiceError> {
        self.get_json("/api/audit").await
    }
}
