use anyhow::{Context, Result};
use clap::Parser;
use rustypaper::{api, config, logging, models::Models, service::RagService};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(
    name = "rustypaper",
    version,
    about = "Ask questions about an uploaded PDF"
)]
struct Cli {
    /// Listening port (overrides SERVER_PORT).
    #[arg(long)]
    port: Option<u16>,
    /// Directory for stored uploads (overrides UPLOAD_DIR).
    #[arg(long)]
    upload_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let mut config = match config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            if matches!(err, config::ConfigError::MissingVariable(_)) {
                eprintln!(
                    "Set {} (or {}) before starting the server.",
                    config::API_KEY_VAR,
                    config::API_KEY_FILE_VAR
                );
            }
            std::process::exit(1);
        }
    };
    if let Some(port) = cli.port {
        config.server_port = Some(port);
    }
    if let Some(dir) = cli.upload_dir {
        config.upload_dir = dir;
    }

    logging::init_tracing();
    if let Err(err) = run(config).await {
        tracing::error!(error = %format!("{err:#}"), "Server stopped");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(config: config::Config) -> Result<()> {
    tracing::info!(
        api_base_url = %config.api_base_url,
        chunk_size = config.chunk_size,
        chunk_overlap = config.chunk_overlap,
        max_indexed_chunks = ?config.max_indexed_chunks,
        similarity_top_k = config.similarity_top_k,
        session_idle_ttl = ?config.session_idle_ttl,
        "Loaded configuration"
    );

    let models = Models::from_config(&config).context("Failed to configure model clients")?;
    let service =
        RagService::from_config(&config, models).context("Failed to initialize RAG service")?;
    let service = Arc::new(service);
    if let Some(ttl) = config.session_idle_ttl {
        service.spawn_session_sweeper(ttl.min(SESSION_SWEEP_INTERVAL));
    }
    let app = api::create_router(service, config.max_upload_bytes);

    let (listener, port) = bind_listener(config.server_port)
        .await
        .context("Failed to bind listener")?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn bind_listener(server_port: Option<u16>) -> Result<(TcpListener, u16), std::io::Error> {
    if let Some(port) = server_port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 4100..=4199;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 4100-4199",
    ))
}
