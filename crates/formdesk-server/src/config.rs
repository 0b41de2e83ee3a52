use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

#[derive(Debug, Clone, Args)]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "FORMDESK_BIND", default_value = "0.0.0.0")]
    pub bind: String,

    /// Port to listen on
    #[arg(long, env = "FORMDESK_PORT", default_value = "5000")]
    pub port: u16,

    /// Template document (JSON array). Defaults to the formdesk data directory.
    #[arg(long, env = "FORMDESK_DATA_FILE")]
    pub data_file: Option<PathBuf>,

    /// Directory holding uploaded files. Defaults to the formdesk data directory.
    #[arg(long, env = "FORMDESK_CONTENT_DIR")]
    pub content_dir: Option<PathBuf>,

    /// Base URL clients use to reach this server; attachment URLs are built from it.
    #[arg(long, env = "FORMDESK_PUBLIC_URL")]
    pub public_url: Option<String>,

    /// Timeout for each document or file operation (seconds).
    #[arg(long, env = "FORMDESK_IO_TIMEOUT", default_value = "30")]
    pub io_timeout: u64,

    /// Largest accepted request body, uploads included (bytes).
    #[arg(long, env = "FORMDESK_MAX_UPLOAD_BYTES", default_value = "52428800")]
    pub max_upload_bytes: usize,

    /// Allowed CORS origins, comma separated. Empty allows any origin.
    #[arg(long = "cors-origin", env = "FORMDESK_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    pub fn data_file(&self) -> PathBuf {
        self.data_file
            .clone()
            .unwrap_or_else(formdesk_db::default_data_file)
    }

    pub fn content_dir(&self) -> PathBuf {
        self.content_dir
            .clone()
            .unwrap_or_else(formdesk_store::default_content_dir)
    }

    pub fn public_url(&self) -> String {
        self.public_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.port))
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        let ip: IpAddr = self.bind.parse()?;
        Ok(SocketAddr::new(ip, self.port))
    }
}
