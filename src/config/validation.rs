//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (TTL within bounds, capacity > 0)
//! - Check that the selected backends have what they need
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use axum::http::HeaderName;
use std::time::Duration;
use url::Url;

use crate::config::schema::{AppConfig, DirectoryBackend, StorageBackend};

/// Longest accepted user cache TTL. The cache builder panics above 1000 years.
pub const MAX_CACHE_TTL: Duration = Duration::from_secs(100 * 365 * 86_400);

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, message: message.into() }
    }
}

/// Check a parsed configuration for semantic problems.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let header = config.security.identity_header.trim();
    if header.is_empty() {
        errors.push(ValidationError::new("security.identity_header", "must not be empty"));
    } else if HeaderName::from_bytes(header.as_bytes()).is_err() {
        errors.push(ValidationError::new("security.identity_header", "is not a valid header name"));
    }

    let ttl = config.cache.users.ttl;
    if ttl.is_zero() {
        errors.push(ValidationError::new("cache.users.ttl", "must be greater than zero"));
    } else if ttl > MAX_CACHE_TTL {
        errors.push(ValidationError::new("cache.users.ttl", "must not exceed 100 years"));
    }
    if config.cache.users.max_capacity == 0 {
        errors.push(ValidationError::new("cache.users.max_capacity", "must be greater than zero"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than zero"));
    }

    match config.directory.backend {
        DirectoryBackend::Memory => {
            if config.directory.users.iter().any(|u| u.dn.trim().is_empty()) {
                errors.push(ValidationError::new("directory.users", "every user needs a dn"));
            }
        }
        DirectoryBackend::Postgres => {
            if config.directory.postgres.db_url.trim().is_empty() {
                errors.push(ValidationError::new("directory.postgres.db_url", "must not be empty"));
            }
        }
        DirectoryBackend::Ldap => {
            let ldap = &config.directory.ldap;
            if Url::parse(&ldap.url).is_err() {
                errors.push(ValidationError::new("directory.ldap.url", "is not a valid URL"));
            }
            if ldap.base_dn.trim().is_empty() {
                errors.push(ValidationError::new("directory.ldap.base_dn", "must not be empty"));
            }
        }
        DirectoryBackend::Remote => {
            if Url::parse(&config.directory.auth_service.base_url).is_err() {
                errors.push(ValidationError::new(
                    "directory.auth_service.base_url",
                    "is not a valid URL",
                ));
            }
            if let Some(tls) = &config.directory.auth_service.tls {
                if tls.keystore_path.is_some() && tls.keystore_password.is_none() {
                    errors.push(ValidationError::new(
                        "directory.auth_service.tls.keystore_password",
                        "is required when keystore_path is set",
                    ));
                }
            }
        }
    }

    if config.storage.backend == StorageBackend::Postgres
        && config.storage.postgres.db_url.trim().is_empty()
    {
        errors.push(ValidationError::new("storage.postgres.db_url", "must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
