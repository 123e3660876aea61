//! Header identity authentication.
//!
//! # Responsibilities
//! - Reject missing or blank identities before touching the directory
//! - Resolve the identity through the (cached) directory
//! - Build the [`Principal`] handed to handlers
//!
//! # Design Decisions
//! - The header value is trusted as-is; proving it is the job of whatever
//!   sits in front of this service
//! - The principal keeps the identity as presented, not the directory's
//!   canonical DN

use axum::http::{HeaderMap, HeaderName};
use std::sync::Arc;

use crate::directory::{DirectoryError, UserDirectory};
use crate::observability::metrics;
use crate::security::principal::ROLE_PREFIX;
use crate::security::Principal;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Missing or empty {0} header")]
    BadCredentials(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Directory unavailable: {0}")]
    DirectoryUnavailable(String),
}

/// First value of `header`, trimmed, or `None` when absent, blank or not
/// valid text.
pub fn extract_identity(headers: &HeaderMap, header: &HeaderName) -> Option<String> {
    headers
        .get(header)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub struct Authenticator {
    directory: Arc<dyn UserDirectory>,
    header: HeaderName,
    grant_prefixes: Vec<String>,
}

impl Authenticator {
    pub fn new(directory: Arc<dyn UserDirectory>, header: HeaderName) -> Self {
        Self {
            directory,
            header,
            grant_prefixes: vec![ROLE_PREFIX.to_string()],
        }
    }

    /// Also grant role `R` to authorities named `<prefix>R`.
    pub fn with_role_prefix(mut self, prefix: &str) -> Self {
        if !prefix.is_empty() && !self.grant_prefixes.iter().any(|p| p == prefix) {
            self.grant_prefixes.push(prefix.to_string());
        }
        self
    }

    /// Authority prefixes handed to every principal.
    pub fn grant_prefixes(&self) -> &[String] {
        &self.grant_prefixes
    }

    /// Name of the header carrying the identity.
    pub fn header(&self) -> &HeaderName {
        &self.header
    }

    /// Authenticate the identity carried by `headers`.
    pub async fn authenticate_headers(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        let identity = extract_identity(headers, &self.header);
        self.authenticate(identity.as_deref()).await
    }

    /// Authenticate an already extracted identity.
    pub async fn authenticate(&self, identity: Option<&str>) -> Result<Principal, AuthError> {
        let Some(identity) = identity.map(str::trim).filter(|i| !i.is_empty()) else {
            tracing::debug!(header = %self.header, "No identity header present");
            metrics::record_authentication("missing_header");
            return Err(AuthError::BadCredentials(self.header.to_string()));
        };

        tracing::debug!(identity = %identity, "Authenticating identity");

        match self.directory.lookup(identity).await {
            Ok(user) => {
                metrics::record_directory_lookup(self.directory.name(), "found");
                metrics::record_authentication("success");
                let principal = Principal::new(identity, user)
                    .with_grant_prefixes(self.grant_prefixes.clone());
                tracing::info!(identity = %identity, roles = ?principal.roles, "Authenticated");
                Ok(principal)
            }
            Err(DirectoryError::UserNotFound(_)) => {
                metrics::record_directory_lookup(self.directory.name(), "not_found");
                metrics::record_authentication("user_not_found");
                tracing::warn!(identity = %identity, "User not found");
                Err(AuthError::UserNotFound(identity.to_string()))
            }
            Err(DirectoryError::Unavailable(reason)) => {
                metrics::record_directory_lookup(self.directory.name(), "error");
                metrics::record_authentication("error");
                tracing::error!(identity = %identity, error = %reason, "Directory lookup failed");
                Err(AuthError::DirectoryUnavailable(reason))
            }
        }
    }
}
