//! Directory backed by the auth service over HTTP(S).
//!
//! `GET {base_url}/api/auth/users/{dn}` with the DN as a single encoded
//! path segment. 404 means the user does not exist; any other failure is an
//! outage.

use async_trait::async_trait;
use reqwest::{Certificate, Client, Identity, StatusCode};
use std::time::Duration;
use url::Url;

use crate::config::{AuthServiceConfig, ClientTlsConfig};
use crate::directory::{BackendSetupError, DirectoryError, ResolvedUser, UserDirectory};

pub struct RemoteDirectory {
    client: Client,
    base_url: Url,
}

impl RemoteDirectory {
    pub fn new(config: &AuthServiceConfig) -> Result<Self, BackendSetupError> {
        let base_url = Url::parse(&config.base_url)?;

        let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_secs));
        if let Some(tls) = &config.tls {
            builder = apply_tls(builder, tls)?;
        }
        let client = builder.build()?;

        tracing::info!(base_url = %base_url, tls = config.tls.is_some(), "Auth service client configured");

        Ok(Self { client, base_url })
    }

    /// URL of the user resource for `dn`.
    pub fn user_url(&self, dn: &str) -> Result<Url, DirectoryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                DirectoryError::Unavailable(format!("base URL cannot have a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(["api", "auth", "users", dn]);
        Ok(url)
    }
}

fn read_file(path: &str) -> Result<Vec<u8>, BackendSetupError> {
    std::fs::read(path).map_err(|source| BackendSetupError::Io {
        path: path.to_string(),
        source,
    })
}

fn apply_tls(
    mut builder: reqwest::ClientBuilder,
    tls: &ClientTlsConfig,
) -> Result<reqwest::ClientBuilder, BackendSetupError> {
    if let Some(path) = &tls.truststore_path {
        let pem = read_file(path)?;
        builder = builder.add_root_certificate(Certificate::from_pem(&pem)?);
    }
    if let Some(path) = &tls.keystore_path {
        let der = read_file(path)?;
        let password = tls.keystore_password.as_deref().unwrap_or_default();
        builder = builder.identity(Identity::from_pkcs12_der(&der, password)?);
    }
    Ok(builder)
}

#[async_trait]
impl UserDirectory for RemoteDirectory {
    async fn lookup(&self, identity: &str) -> Result<ResolvedUser, DirectoryError> {
        let url = self.user_url(identity)?;
        tracing::debug!(url = %url, "Calling auth service");

        let response = self.client.get(url).send().await.map_err(|e| {
            tracing::error!(error = %e, dn = %identity, "Auth service request failed");
            DirectoryError::Unavailable(e.to_string())
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::warn!(dn = %identity, "User not found in auth service");
            return Err(DirectoryError::UserNotFound(identity.to_string()));
        }
        if !status.is_success() {
            tracing::error!(status = %status, dn = %identity, "Auth service returned an error");
            return Err(DirectoryError::Unavailable(format!(
                "auth service returned {}",
                status
            )));
        }

        let user: ResolvedUser = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Invalid auth service response");
            DirectoryError::Unavailable(e.to_string())
        })?;

        tracing::debug!(dn = %user.dn, roles = ?user.roles, "Auth service resolved user");
        Ok(user)
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
