use anyhow::Result;
use clap::{Parser, Subcommand};
use formdesk_db::JsonFileStore;
use formdesk_server::ServerConfig;
use formdesk_service::TemplateService;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "formdesk-server", about = "Form template catalog with file attachments")]
struct Cli {
    #[command(flatten)]
    config: ServerConfig,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve,
    /// Write the sample templates into an empty document
    Seed {
        /// Overwrite the document even when it already has templates
        #[arg(long)]
        force: bool,
    },
    /// Compare template references with the content directory
    Audit,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let addr = config.socket_addr()?;
            let listener = TcpListener::bind(addr).await?;
            info!(
                %addr,
                data_file = %config.data_file().display(),
                content_dir = %config.content_dir().display(),
                "formdesk-server listening"
            );
            formdesk_server::serve(listener, &config).await?;
        }
        Commands::Seed { force } => {
            let store = JsonFileStore::open(&config.data_file())?;
            if formdesk_db::seed::seed(&store, force).await? {
                eprintln!("Seeded sample templates into {}", store.path().display());
            } else {
                eprintln!(
                    "{} already has templates; pass --force to overwrite",
                    store.path().display()
                );
            }
        }
        Commands::Audit => {
            let service = formdesk_server::open_service(&config)?;
            let report = service.audit().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.is_consistent() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
