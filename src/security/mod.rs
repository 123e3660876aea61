//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → paths.rs (public allowlist; match skips everything below)
//!     → authentication.rs (header → directory → Principal)
//!     → request extensions (Principal for handlers)
//!     → principal.rs (role checks inside the book service)
//! ```
//!
//! # Design Decisions
//! - Fail closed: a missing header never reaches a handler
//! - Directory outages surface as 500, unknown users as 401
//! - Roles are checked where the operation is, not in the router

pub mod authentication;
pub mod paths;
pub mod principal;

pub use authentication::{extract_identity, AuthError, Authenticator};
pub use paths::PublicPaths;
pub use principal::{AccessDenied, Principal, READ_ONLY, READ_WRITE};
