//! TLS listener support.

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::config::TlsConfig;

/// How long in-flight requests get to finish after shutdown is requested.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

fn ensure_exists(path: &Path, what: &str) -> Result<(), std::io::Error> {
    if path.exists() {
        Ok(())
    } else {
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} file not found: {:?}", what, path),
        ))
    }
}

/// Load a rustls configuration from PEM certificate and key files.
pub async fn load_tls_config(config: &TlsConfig) -> Result<RustlsConfig, std::io::Error> {
    let cert_path = Path::new(&config.cert_path);
    let key_path = Path::new(&config.key_path);
    ensure_exists(cert_path, "Certificate")?;
    ensure_exists(key_path, "Private key")?;

    RustlsConfig::from_pem_file(cert_path, key_path).await
}

/// Serve `router` over HTTPS until `shutdown` fires.
pub async fn serve_tls(
    addr: SocketAddr,
    tls: RustlsConfig,
    router: Router,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let handle = Handle::new();
    let signal_handle = handle.clone();
    tokio::spawn(async move {
        let _ = shutdown.recv().await;
        tracing::info!("Shutdown signal received");
        signal_handle.graceful_shutdown(Some(DRAIN_TIMEOUT));
    });

    tracing::info!(address = %addr, "HTTPS server starting");
    axum_server::bind_rustls(addr, tls)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;
    tracing::info!("HTTPS server stopped");
    Ok(())
}
