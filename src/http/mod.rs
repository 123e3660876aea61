//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, layer stack)
//!     → request.rs (request ID, span)
//!     → middleware/ (header dump, authentication)
//!     → books::handlers or actuator endpoints
//!     → response.rs (Problem Details, 401 body)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::ProblemDetail;
pub use server::{AppState, HttpServer};
