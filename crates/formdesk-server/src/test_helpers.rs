use std::path::{Path, PathBuf};

use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;

use crate::config::ServerConfig;

/// A router over a throwaway template document and content directory.
pub struct TestApp {
    pub router: Router,
    pub data_file: PathBuf,
    pub content_dir: PathBuf,
    _dir: TempDir,
}

/// Server settings rooted in `dir`, with the same defaults the CLI uses.
pub fn test_config(dir: &Path) -> ServerConfig {
    ServerConfig {
        bind: "127.0.0.1".into(),
        port: 0,
        data_file: Some(dir.join("templates.json")),
        content_dir: Some(dir.join("uploads")),
        public_url: Some("http://localhost:5000".into()),
        io_timeout: 30,
        max_upload_bytes: 50 * 1024 * 1024,
        cors_origins: Vec::new(),
    }
}

fn write_document(config: &ServerConfig, templates: &Value) {
    std::fs::write(
        config.data_file(),
        serde_json::to_vec_pretty(templates).unwrap(),
    )
    .unwrap();
}

/// Build a test app whose document starts out as `[]`.
pub async fn test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    app_from(dir, config)
}

/// Build a test app whose document starts out as `templates`.
pub async fn test_app_with(templates: Value) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    write_document(&config, &templates);
    app_from(dir, config)
}

/// Like [`test_app_with`] with a smaller request body limit.
pub async fn test_app_with_limit(templates: Value, max_upload_bytes: usize) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.max_upload_bytes = max_upload_bytes;
    write_document(&config, &templates);
    app_from(dir, config)
}

fn app_from(dir: TempDir, config: ServerConfig) -> TestApp {
    let router = crate::build_app(&config).unwrap();
    TestApp {
        router,
        data_file: config.data_file(),
        content_dir: config.content_dir(),
        _dir: dir,
    }
}

/// A running test server with base_url and background task handle.
pub struct TestServer {
    pub base_url: String,
    pub data_file: PathBuf,
    pub content_dir: PathBuf,
    _dir: TempDir,
    _handle: tokio::task::JoinHandle<()>,
}

/// Spawn a server on a random port with an empty template document.
pub async fn spawn_test_server() -> TestServer {
    spawn_test_server_with(Value::Array(Vec::new())).await
}

/// Spawn a server on a random port whose document starts out as `templates`.
/// Attachment URLs point back at the spawned server.
pub async fn spawn_test_server_with(templates: Value) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{addr}");

    let mut config = test_config(dir.path());
    config.port = addr.port();
    config.public_url = Some(base_url.clone());
    config.io_timeout = 10;
    write_document(&config, &templates);

    let app = crate::build_app(&config).unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    TestServer {
        base_url,
        data_file: config.data_file(),
        content_dir: config.content_dir(),
        _dir: dir,
        _handle: handle,
    }
}
