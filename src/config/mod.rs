//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → handed to lifecycle::startup to build subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod duration;
pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::AppConfig;
pub use schema::{
    AuthServiceConfig, CacheConfig, ClientTlsConfig, DirectoryBackend, DirectoryConfig,
    LdapConfig, ListenerConfig, ObservabilityConfig, PostgresConfig, SecurityConfig,
    StorageBackend, StorageConfig, TlsConfig, UserCacheConfig, UserEntryConfig,
};
