//! Standalone auth service: serves `GET /api/auth/users/{dn}` from the
//! configured directory backend.

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use acme_api::auth_service;
use acme_api::config::{load_config, AppConfig, DirectoryBackend};
use acme_api::lifecycle::{build_directory, wait_for_signal, Shutdown, StartupError};
use acme_api::observability::logging;

#[derive(Parser)]
#[command(name = "acme-auth-service")]
#[command(about = "Resolves directory users for remote book API instances", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listener bind address.
    #[arg(short, long, default_value = "0.0.0.0:8082")]
    bind: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!("acme-auth-service v{} starting", env!("CARGO_PKG_VERSION"));

    if config.directory.backend == DirectoryBackend::Remote {
        return Err(StartupError::Unsupported(
            "the auth service cannot use the remote directory backend".to_string(),
        )
        .into());
    }

    let directory = build_directory(&config.directory)?;
    let app = auth_service::router(directory);

    let listener = TcpListener::bind(&args.bind).await?;
    tracing::info!(address = %listener.local_addr()?, "Auth service listening");

    let shutdown = Shutdown::new();
    let mut server_shutdown = shutdown.subscribe();

    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.recv().await;
            })
            .await
    });

    wait_for_signal(&shutdown).await;
    server.await??;
    tracing::info!("acme-auth-service stopped");
    Ok(())
}
