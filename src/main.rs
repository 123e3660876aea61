//! Acme book API.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────────┐
//!                 │                        BOOK API                           │
//!                 │                                                           │
//!   Request       │  ┌──────────┐   ┌────────────┐   ┌──────────────────┐     │
//!   (x-dn) ───────┼─▶│ request  │──▶│ header dump│──▶│ authentication   │     │
//!                 │  │ id/trace │   │  (DEBUG)   │   │ (public skip)    │     │
//!                 │  └──────────┘   └────────────┘   └────────┬─────────┘     │
//!                 │                                           │               │
//!                 │                                           ▼               │
//!                 │                                  ┌──────────────────┐     │
//!                 │                                  │  user cache (TTL)│     │
//!                 │                                  └────────┬─────────┘     │
//!                 │                                           │ miss          │
//!                 │                                           ▼               │
//!                 │                     memory │ postgres │ ldap │ remote     │
//!                 │                                           │               │
//!                 │                                           ▼               │
//!   Response ◀────┼──────────── books handlers ◀── Principal + roles          │
//!                 └──────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;

use acme_api::config::{load_config, AppConfig};
use acme_api::http::HttpServer;
use acme_api::lifecycle::{build_app_state, wait_for_signal, Shutdown};
use acme_api::net;
use acme_api::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "acme-api")]
#[command(about = "Book API with header-based authentication", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability.log_level);
    tracing::info!("acme-api v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        directory = ?config.directory.backend,
        storage = ?config.storage.backend,
        cache_ttl = ?config.cache.users.ttl,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let tls = config.listener.tls.clone();
    let bind_address = config.listener.bind_address.clone();

    let state = build_app_state(config).await?;
    if let Some(handle) = state.metrics.clone() {
        metrics::spawn_upkeep(handle);
    }
    let server = HttpServer::new(state);

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    let mut server_task = tokio::spawn(async move {
        match tls {
            Some(tls) => {
                let rustls = net::load_tls_config(&tls).await?;
                let addr: SocketAddr = bind_address.parse().map_err(|e| {
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("{}", e))
                })?;
                net::serve_tls(addr, rustls, server.into_router(), server_shutdown).await
            }
            None => {
                let listener = TcpListener::bind(&bind_address).await?;
                server.run(listener, server_shutdown).await
            }
        }
    });

    tokio::select! {
        result = &mut server_task => {
            result??;
            return Ok(());
        }
        _ = wait_for_signal(&shutdown) => {
            tracing::info!("Waiting for in-flight requests");
        }
    }

    server_task.await??;
    tracing::info!("acme-api stopped");
    Ok(())
}
