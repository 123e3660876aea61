//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use acme_api::config::{AppConfig, UserEntryConfig};
use acme_api::directory::{MemoryDirectory, ResolvedUser, UserDirectory};
use acme_api::lifecycle::{build_app_state, Shutdown};
use acme_api::{auth_service, HttpServer};

pub const WRITER_DN: &str = "cn=John Doe,ou=Engineering,dc=corp,dc=acme,dc=org";
pub const READER_DN: &str = "cn=Jane Roe,ou=Sales,dc=corp,dc=acme,dc=org";

/// Users known to every test server.
pub fn seed_users() -> Vec<UserEntryConfig> {
    vec![
        UserEntryConfig {
            dn: WRITER_DN.to_string(),
            given_name: Some("John".to_string()),
            surname: Some("Doe".to_string()),
            roles: vec!["READ_WRITE".to_string()],
        },
        UserEntryConfig {
            dn: READER_DN.to_string(),
            given_name: Some("Jane".to_string()),
            surname: Some("Roe".to_string()),
            roles: vec!["ROLE_READ_ONLY".to_string()],
        },
    ]
}

/// Directory holding [`seed_users`].
pub fn seeded_directory() -> Arc<dyn UserDirectory> {
    let directory = MemoryDirectory::new();
    for user in seed_users() {
        directory.insert(ResolvedUser {
            dn: user.dn,
            given_name: user.given_name,
            surname: user.surname,
            roles: user.roles,
        });
    }
    Arc::new(directory)
}

/// Client that never reuses connections and ignores proxy settings.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// Start the book API on an ephemeral port. Dropping the returned
/// [`Shutdown`] without triggering it leaves the server running until the
/// test runtime ends.
pub async fn start_api(mut config: AppConfig) -> (SocketAddr, Shutdown) {
    if config.directory.users.is_empty() {
        config.directory.users = seed_users();
    }

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let state = build_app_state(config).await.unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = HttpServer::new(state).run(listener, rx).await;
    });

    (addr, shutdown)
}

/// Start the auth service over `directory` on an ephemeral port.
pub async fn start_auth_service(directory: Arc<dyn UserDirectory>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = auth_service::router(directory);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}
