//! User directory subsystem.
//!
//! # Data Flow
//! ```text
//! identity (DN or username)
//!     → cached.rs (TTL cache; hit returns immediately)
//!     → one backend on miss:
//!         memory.rs   (seeded users, tests and development)
//!         postgres.rs (users ⟕ user_roles)
//!         ldap.rs     (exact lookup → CN fallback → group search)
//!         remote.rs   (HTTP call to the auth service)
//!     → ResolvedUser { dn, givenName, surname, roles }
//! ```
//!
//! # Design Decisions
//! - One trait, backends chosen once at startup
//! - Lookups fail with `UserNotFound` or `Unavailable`, nothing else
//! - Blocking clients are offloaded to the blocking pool inside the backend

pub mod cached;
pub mod dn;
pub mod ldap;
pub mod memory;
pub mod postgres;
pub mod remote;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use cached::CachedDirectory;
pub use ldap::LdapDirectory;
pub use memory::MemoryDirectory;
pub use postgres::PostgresDirectory;
pub use remote::RemoteDirectory;

/// A user as resolved by a directory backend. Same shape as the auth
/// service's JSON payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedUser {
    pub dn: String,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Lookup failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    #[error("User not found with DN: {0}")]
    UserNotFound(String),

    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

/// Failure while constructing a backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendSetupError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Database(String),
}

/// Resolves an identity to a user and its roles.
#[async_trait]
pub trait UserDirectory: Send + Sync + 'static {
    /// Look up `identity`, which the caller has already trimmed.
    async fn lookup(&self, identity: &str) -> Result<ResolvedUser, DirectoryError>;

    /// Short backend name for logs and metrics.
    fn name(&self) -> &'static str;
}
