use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use formdesk_core::UploadFile;
use formdesk_service::TemplateService;
use serde_json::{json, Value};

use super::{bad_request, payload_too_large, to_error, ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/upload", post(upload))
        .route("/api/files/{filename}", delete(delete_file))
        .route("/api/audit", get(audit))
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return payload_too_large(e.body_text());
    }
    bad_request(format!("malformed upload: {}", e.body_text()))
}

fn parse_template_id(raw: Option<&str>) -> Result<i64, ApiError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| bad_request("templateId is required"))?;
    raw.parse()
        .map_err(|_| bad_request(format!("templateId {raw:?} is not an integer")))
}

async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut template_id: Option<String> = None;
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "templateId" => {
                template_id = Some(field.text().await.map_err(multipart_error)?);
            }
            "files" | "files[]" => {
                let original_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(multipart_error)?;
                // An empty file input still submits one nameless, empty part.
                if original_name.is_empty() && data.is_empty() {
                    continue;
                }
                files.push(UploadFile::new(original_name, data));
            }
            _ => {}
        }
    }

    if files.is_empty() {
        return Err(bad_request("no files uploaded"));
    }
    let template_id = parse_template_id(template_id.as_deref())?;

    state
        .service
        .upload_attachments(template_id, files)
        .await
        .map(|f| Json(json!({ "success": true, "files": f })))
        .map_err(to_error)
}

async fn delete_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .service
        .delete_attachment(&filename)
        .await
        .map(|_| Json(json!({ "success": true })))
        .map_err(to_error)
}

async fn audit(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state
        .service
        .audit()
        .await
        .map(|r| Json(json!(r)))
        .map_err(to_error)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::test_helpers::{test_app_with, test_app_with_limit, TestApp};

    const BOUNDARY: &str = "formdesk-test-boundary";

    fn multipart_body(template_id: Option<&str>, files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some(id) = template_id {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"templateId\"\r\n\r\n{id}\r\n"
                )
                .as_bytes(),
            );
        }
        for (name, data) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(template_id: Option<&str>, files: &[(&str, &[u8])]) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(template_id, files)))
            .unwrap()
    }

    fn delete_request(encoded_name: &str) -> Request<Body> {
        Request::builder()
            .method(Method::DELETE)
            .uri(format!("/api/files/{encoded_name}"))
            .body(Body::empty())
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn content_files(app: &TestApp) -> Vec<String> {
        std::fs::read_dir(&app.content_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    fn one_empty_template() -> Value {
        json!([{ "id": 2, "templateNo": "8", "name": "Exit", "attachments": [] }])
    }

    #[tokio::test]
    async fn upload_to_missing_template_is_not_found() {
        let app = test_app_with(json!([])).await;
        let (status, body) = send(&app, upload_request(Some("1"), &[("a.txt", b"hello")])).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "template_not_found");
        assert!(content_files(&app).is_empty());
    }

    #[tokio::test]
    async fn upload_serve_and_delete() {
        let app = test_app_with(one_empty_template()).await;
        let payload = vec![7u8; 1024];
        let (status, body) =
            send(&app, upload_request(Some("2"), &[("report.pdf", &payload)])).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let file = &body["files"][0];
        assert_eq!(file["originalName"], "report.pdf");
        assert_eq!(file["size"], 1024);
        let stored = file["storedName"].as_str().unwrap().to_string();
        assert!(stored.ends_with("-report.pdf"));
        assert!(file["url"].as_str().unwrap().ends_with(&format!("/uploads/{stored}")));

        let (_, list) = send(&app, get_request("/api/templates")).await;
        assert_eq!(list[0]["attachments"].as_array().unwrap().len(), 1);

        let resp = app
            .router
            .clone()
            .oneshot(get_request(&format!("/uploads/{stored}")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let served = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(served.as_ref(), payload.as_slice());

        let (status, body) = send(&app, delete_request(&stored)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert!(content_files(&app).is_empty());

        let (_, list) = send(&app, get_request("/api/templates")).await;
        assert_eq!(list[0]["attachments"], json!([]));

        let (status, _) = send(&app, delete_request(&stored)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn upload_without_files_is_bad_request() {
        let app = test_app_with(one_empty_template()).await;
        let (status, body) = send(&app, upload_request(Some("2"), &[])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_input");

        let (status, _) = send(&app, upload_request(Some("2"), &[("", b"")])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upload_with_bad_template_id_is_bad_request() {
        let app = test_app_with(one_empty_template()).await;
        for id in [None, Some("two"), Some(" ")] {
            let (status, _) = send(&app, upload_request(id, &[("a.txt", b"x")])).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "templateId {id:?}");
        }
        assert!(content_files(&app).is_empty());
    }

    #[tokio::test]
    async fn malformed_multipart_is_bad_request() {
        let app = test_app_with(one_empty_template()).await;
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/upload")
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from("--wrong\r\ngarbage"))
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let app = test_app_with_limit(one_empty_template(), 1024).await;
        let big = vec![0u8; 8 * 1024];
        let (status, _) = send(&app, upload_request(Some("2"), &[("big.bin", &big)])).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(content_files(&app).is_empty());
    }

    #[tokio::test]
    async fn traversal_name_lands_inside_content_dir() {
        let app = test_app_with(one_empty_template()).await;
        let (status, body) =
            send(&app, upload_request(Some("2"), &[("../../etc/passwd", b"root")])).await;
        assert_eq!(status, StatusCode::OK);
        let stored = body["files"][0]["storedName"].as_str().unwrap();
        assert!(!stored.contains('/'));
        assert_eq!(content_files(&app), vec![stored.to_string()]);
    }

    #[tokio::test]
    async fn delete_rejects_encoded_traversal() {
        let app = test_app_with(one_empty_template()).await;
        let (status, body) = send(&app, delete_request("..%2F..%2Fetc%2Fpasswd")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_name");
    }

    #[tokio::test]
    async fn delete_unknown_name_is_not_found() {
        let app = test_app_with(one_empty_template()).await;
        let (status, body) = send(&app, delete_request("123-nothing.pdf")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "attachment_not_found");
    }

    #[tokio::test]
    async fn delete_decodes_spaces_in_name() {
        let app = test_app_with(one_empty_template()).await;
        let (_, body) = send(&app, upload_request(Some("2"), &[("Q1 plan (v2).pdf", b"x")])).await;
        let stored = body["files"][0]["storedName"].as_str().unwrap().to_string();
        assert!(stored.ends_with("-Q1 plan (v2).pdf"));

        let encoded = stored.replace(' ', "%20");
        let (status, _) = send(&app, delete_request(&encoded)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_files(&app).is_empty());
    }

    #[tokio::test]
    async fn audit_reports_orphans() {
        let app = test_app_with(one_empty_template()).await;
        let (_, body) = send(&app, get_request("/api/audit")).await;
        assert_eq!(body["orphans"], json!([]));

        std::fs::write(app.content_dir.join("1-stray.txt"), b"x").unwrap();
        let (status, body) = send(&app, get_request("/api/audit")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["orphans"], json!(["1-stray.txt"]));
        assert_eq!(body["dangling"], json!([]));
    }
}
