//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the directory backend selected in configuration
//! - Wrap it in the user cache and the authenticator
//! - Build the book repository and service
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Directory backends connect lazily; the book store creates its schema
//!   up front

use axum::http::header::InvalidHeaderName;
use axum::http::HeaderName;
use std::sync::Arc;

use crate::books::{BookRepository, BookService, MemoryBookRepository, PostgresBookRepository};
use crate::config::validation::validate_config;
use crate::config::{AppConfig, ConfigError, DirectoryBackend, DirectoryConfig, StorageBackend};
use crate::db::{self, DbError};
use crate::directory::{
    BackendSetupError, CachedDirectory, LdapDirectory, MemoryDirectory, PostgresDirectory,
    RemoteDirectory, UserDirectory,
};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::{Authenticator, PublicPaths};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("directory backend error: {0}")]
    Backend(#[from] BackendSetupError),

    #[error("database error: {0}")]
    Database(#[from] DbError),

    #[error("invalid identity header: {0}")]
    Header(#[from] InvalidHeaderName),

    #[error("{0}")]
    Unsupported(String),
}

/// Build the uncached backend selected by `config.backend`.
pub fn build_directory(config: &DirectoryConfig) -> Result<Arc<dyn UserDirectory>, StartupError> {
    let directory: Arc<dyn UserDirectory> = match config.backend {
        DirectoryBackend::Memory => Arc::new(MemoryDirectory::from_entries(&config.users)),
        DirectoryBackend::Postgres => {
            Arc::new(PostgresDirectory::new(db::build_pool(&config.postgres)?))
        }
        DirectoryBackend::Ldap => Arc::new(LdapDirectory::new(config.ldap.clone())),
        DirectoryBackend::Remote => Arc::new(RemoteDirectory::new(&config.auth_service)?),
    };

    tracing::info!(backend = directory.name(), "Directory backend ready");
    Ok(directory)
}

async fn build_repository(config: &AppConfig) -> Result<Arc<dyn BookRepository>, StartupError> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory book storage");
            Ok(Arc::new(MemoryBookRepository::new()))
        }
        StorageBackend::Postgres => {
            let pool = db::build_pool(&config.storage.postgres)?;
            db::initialize_schema(&pool).await?;
            tracing::info!("Using Postgres book storage");
            Ok(Arc::new(PostgresBookRepository::new(pool)))
        }
    }
}

/// Build everything the book API router needs.
pub async fn build_app_state(config: AppConfig) -> Result<AppState, StartupError> {
    validate_config(&config).map_err(ConfigError::Validation)?;
    let header = HeaderName::from_bytes(config.security.identity_header.trim().as_bytes())?;

    let backend = build_directory(&config.directory)?;
    let directory: Arc<dyn UserDirectory> =
        Arc::new(CachedDirectory::new(backend, &config.cache.users));
    let authenticator = Arc::new(
        Authenticator::new(directory, header).with_role_prefix(&config.directory.ldap.role_prefix),
    );

    let books = Arc::new(BookService::new(build_repository(&config).await?));

    let metrics = if config.observability.metrics_enabled {
        metrics::init_metrics()
    } else {
        None
    };

    tracing::info!(
        identity_header = %authenticator.header(),
        grant_prefixes = ?authenticator.grant_prefixes(),
        public_paths = ?config.security.public_paths,
        "Authentication configured"
    );

    Ok(AppState {
        public_paths: Arc::new(PublicPaths::new(&config.security.public_paths)),
        config: Arc::new(config),
        authenticator,
        books,
        metrics,
    })
}
