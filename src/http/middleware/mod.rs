//! Request entry middleware.
//!
//! Outermost first: header logging, then authentication. Both skip the
//! public path allowlist.

pub mod authentication;
pub mod header_logging;

pub use authentication::authentication_middleware;
pub use header_logging::header_logging_middleware;
