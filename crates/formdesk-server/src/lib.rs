pub mod config;
mod routes;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use formdesk_db::JsonFileStore;
use formdesk_service::{LocalService, ServiceConfig};
use formdesk_store::StoreConfig;
use tokio::net::TcpListener;

pub use config::ServerConfig;

/// Open the template document and content directory named by `config`,
/// creating either when absent.
pub fn open_service(config: &ServerConfig) -> Result<LocalService> {
    let records = Arc::new(JsonFileStore::open(&config.data_file())?);
    let files = formdesk_store::create_store(&StoreConfig {
        content_dir: Some(config.content_dir().to_string_lossy().into_owned()),
    })?;
    let service = LocalService::new(
        records,
        files,
        &ServiceConfig {
            public_url: config.public_url(),
            io_timeout: config.io_timeout(),
        },
    )?;
    Ok(service)
}

pub fn build_app(config: &ServerConfig) -> Result<Router> {
    let service = open_service(config)?;
    let state = Arc::new(routes::InnerAppState { service });
    Ok(routes::build_router(state, config))
}

pub async fn serve(listener: TcpListener, config: &ServerConfig) -> Result<()> {
    let app = build_app(config)?;
    axum::serve(listener, app).await?;
    Ok(())
}
