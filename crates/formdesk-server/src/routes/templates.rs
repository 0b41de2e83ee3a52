use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use formdesk_core::TemplateInput;
use formdesk_service::TemplateService;
use serde_json::{json, Value};

use super::{bad_request, payload_too_large, to_error, ApiError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/templates", get(list_templates).put(replace_templates))
}

fn json_error(e: JsonRejection) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return payload_too_large(e.body_text());
    }
    bad_request(e.body_text())
}

async fn list_templates(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state
        .service
        .list_templates()
        .await
        .map(|t| Json(json!(t)))
        .map_err(to_error)
}

async fn replace_templates(
    State(state): State<AppState>,
    payload: Result<Json<Vec<TemplateInput>>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(templates) = payload.map_err(json_error)?;
    state
        .service
        .replace_templates(templates)
        .await
        .map(|t| Json(json!({ "success": true, "templates": t })))
        .map_err(to_error)
}
