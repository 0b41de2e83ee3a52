pub mod files;
pub mod health;
pub mod templates;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, StatusCode};
use axum::{Json, Router};
use formdesk_core::UPLOADS_PREFIX;
use formdesk_service::{LocalService, ServiceError};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::config::ServerConfig;

pub struct InnerAppState {
    pub service: LocalService,
}

pub type AppState = Arc<InnerAppState>;

pub type ApiError = (StatusCode, Json<Value>);

pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(templates::routes())
        .merge(files::routes())
        .nest_service(UPLOADS_PREFIX, ServeDir::new(config.content_dir()))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = o, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

pub fn status_of(e: &ServiceError) -> StatusCode {
    match e {
        ServiceError::TemplateNotFound(_) | ServiceError::AttachmentNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        ServiceError::InvalidName(_) | ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ServiceError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        ServiceError::StoreUnreadable(_)
        | ServiceError::StoreWrite(_)
        | ServiceError::UploadFailed(_)
        | ServiceError::DeletionFailed(_)
        | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn to_error(e: ServiceError) -> ApiError {
    let status = status_of(&e);
    if status.is_server_error() {
        error!(code = e.code(), "{e}");
    }
    (
        status,
        Json(json!({ "error": e.to_string(), "code": e.code(), "detail": e.detail() })),
    )
}

/// A 413 for bodies over the configured limit.
pub fn payload_too_large(detail: impl Into<String>) -> ApiError {
    let detail = detail.into();
    (
        StatusCode::PAYLOAD_TOO_LARGE,
        Json(json!({
            "error": format!("request body too large: {detail}"),
            "code": "payload_too_large",
            "detail": detail,
        })),
    )
}

/// A 400 for request shapes the service never sees.
pub fn bad_request(detail: impl Into<String>) -> ApiError {
    to_error(ServiceError::InvalidInput(detail.into()))
}
